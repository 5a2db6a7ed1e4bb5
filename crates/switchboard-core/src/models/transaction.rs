//! Transaction definitions (workflow templates between two entities)
//! and their executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SwitchboardResult;
use crate::validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDefinition {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub source_entity_id: Uuid,
    pub target_entity_id: Uuid,
    pub workflow: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionDefinition {
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_entity_id: Uuid,
    pub target_entity_id: Uuid,
    pub workflow: Option<serde_json::Value>,
}

impl CreateTransactionDefinition {
    pub fn validate(&self) -> SwitchboardResult<()> {
        validate::name("name", &self.name)?;
        if let Some(workflow) = &self.workflow {
            validate::json_object("workflow", workflow)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTransactionDefinition {
    pub name: Option<String>,
    pub description: Option<String>,
    pub source_entity_id: Option<Uuid>,
    pub target_entity_id: Option<Uuid>,
    pub workflow: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

impl UpdateTransactionDefinition {
    pub fn validate(&self) -> SwitchboardResult<()> {
        if let Some(name) = &self.name {
            validate::name("name", name)?;
        }
        if let Some(workflow) = &self.workflow {
            validate::json_object("workflow", workflow)?;
        }
        Ok(())
    }
}

/// Status of a single execution. Any status may follow any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInstance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub definition_id: Uuid,
    pub status: TransactionStatus,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionInstance {
    pub tenant_id: Uuid,
    pub definition_id: Uuid,
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTransactionStatus {
    pub status: TransactionStatus,
    pub error_message: Option<String>,
}
