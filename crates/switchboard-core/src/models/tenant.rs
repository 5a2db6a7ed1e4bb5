//! Tenant domain model.
//!
//! Tenants provide full data isolation. Every other tenant-scoped record
//! (roles, teams, entities, assets, transactions, logs) carries the
//! owning `tenant_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SwitchboardResult;
use crate::validate;

/// An isolated organizational workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe unique identifier (e.g., `acme`). Immutable once created.
    pub slug: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

impl CreateTenant {
    pub fn validate(&self) -> SwitchboardResult<()> {
        validate::name("name", &self.name)?;
        validate::slug(&self.slug)
    }
}

/// Fields that can be updated on an existing tenant. The slug is not
/// among them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateTenant {
    pub fn validate(&self) -> SwitchboardResult<()> {
        if let Some(name) = &self.name {
            validate::name("name", name)?;
        }
        Ok(())
    }
}
