//! Team and team-membership domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SwitchboardResult;
use crate::validate;

/// A tenant-scoped group of agents with an optional manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub manager_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub manager_id: Option<Uuid>,
}

impl CreateTeam {
    pub fn validate(&self) -> SwitchboardResult<()> {
        validate::name("name", &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(Some(id))` = set, `Some(None)` = clear, `None` = no change.
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub manager_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

impl UpdateTeam {
    pub fn validate(&self) -> SwitchboardResult<()> {
        if let Some(name) = &self.name {
            validate::name("name", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    #[default]
    Member,
    Lead,
    Admin,
}

/// Membership rows are never removed, only deactivated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMembership {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}
