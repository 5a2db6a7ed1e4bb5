//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SwitchboardResult;
use crate::models::permission::PermissionSet;
use crate::validate;

/// Name of the preset role seeded into every new tenant.
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// A named, tenant-scoped bundle of permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub permissions: PermissionSet,
    /// Preset roles cannot be deleted or have their permissions edited.
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub permissions: PermissionSet,
    pub is_system: bool,
}

impl CreateRole {
    pub fn validate(&self) -> SwitchboardResult<()> {
        validate::name("name", &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<PermissionSet>,
}

impl UpdateRole {
    pub fn validate(&self) -> SwitchboardResult<()> {
        if let Some(name) = &self.name {
            validate::name("name", name)?;
        }
        Ok(())
    }
}
