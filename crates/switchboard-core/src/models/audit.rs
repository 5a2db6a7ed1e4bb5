//! Audit and monitoring records. Both are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Access,
    Error,
    Exception,
    Activity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub category: LogCategory,
    pub action: String,
    pub method: Option<String>,
    pub path: Option<String>,
    pub status: Option<u16>,
    pub duration_ms: Option<u64>,
    pub message: String,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLogEntry {
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub category: LogCategory,
    pub action: String,
    pub method: Option<String>,
    pub path: Option<String>,
    pub status: Option<u16>,
    pub duration_ms: Option<u64>,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}

impl CreateLogEntry {
    /// A user-activity record with only the essentials filled in.
    pub fn activity(tenant_id: Uuid, user_id: Uuid, action: impl Into<String>) -> Self {
        let action = action.into();
        Self {
            tenant_id: Some(tenant_id),
            user_id: Some(user_id),
            category: LogCategory::Activity,
            message: action.clone(),
            action,
            method: None,
            path: None,
            status: None,
            duration_ms: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub id: Uuid,
    pub component: String,
    pub status: HealthStatus,
    pub latency_ms: u64,
    pub detail: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub latency_ms: u64,
    pub detail: Option<String>,
}
