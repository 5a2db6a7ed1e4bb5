//! Screen asset domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SwitchboardResult;
use crate::validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Screen,
    Form,
    Report,
    Dashboard,
}

/// A configurable UI surface, optionally bound to an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenAsset {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub asset_type: AssetType,
    pub entity_id: Option<Uuid>,
    pub configuration: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScreenAsset {
    pub tenant_id: Uuid,
    pub name: String,
    pub asset_type: AssetType,
    pub entity_id: Option<Uuid>,
    pub configuration: Option<serde_json::Value>,
}

impl CreateScreenAsset {
    pub fn validate(&self) -> SwitchboardResult<()> {
        validate::name("name", &self.name)?;
        if let Some(configuration) = &self.configuration {
            validate::json_object("configuration", configuration)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateScreenAsset {
    pub name: Option<String>,
    pub asset_type: Option<AssetType>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub entity_id: Option<Option<Uuid>>,
    pub configuration: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

impl UpdateScreenAsset {
    pub fn validate(&self) -> SwitchboardResult<()> {
        if let Some(name) = &self.name {
            validate::name("name", name)?;
        }
        if let Some(configuration) = &self.configuration {
            validate::json_object("configuration", configuration)?;
        }
        Ok(())
    }
}
