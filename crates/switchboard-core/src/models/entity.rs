//! Entity domain model: user-defined business-object types arranged in
//! a tenant-scoped tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SwitchboardResult;
use crate::validate;

/// Maximum depth of the entity tree, root included.
pub const MAX_ENTITY_DEPTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub parent_entity_id: Option<Uuid>,
    /// Field definitions, free-form JSON object.
    pub schema: serde_json::Value,
    pub record_count: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntity {
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parent_entity_id: Option<Uuid>,
    pub schema: Option<serde_json::Value>,
}

impl CreateEntity {
    pub fn validate(&self) -> SwitchboardResult<()> {
        validate::name("name", &self.name)?;
        if let Some(schema) = &self.schema {
            validate::json_object("schema", schema)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub parent_entity_id: Option<Option<Uuid>>,
    pub schema: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

impl UpdateEntity {
    pub fn validate(&self) -> SwitchboardResult<()> {
        if let Some(name) = &self.name {
            validate::name("name", name)?;
        }
        if let Some(schema) = &self.schema {
            validate::json_object("schema", schema)?;
        }
        Ok(())
    }
}
