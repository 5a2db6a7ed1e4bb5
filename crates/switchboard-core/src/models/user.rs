//! User domain model.
//!
//! Users are global identities created on first sign-in through the
//! external identity provider. Tenant membership is expressed through
//! role assignments, never through a stored "current tenant".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SwitchboardResult;
use crate::validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Subject claim issued by the identity provider.
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    /// Free-form job title shown in the dashboard (e.g. `Supervisor`).
    pub role_label: String,
    pub is_platform_admin: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sign-in payload: creates the user on first sight, refreshes the
/// profile afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertUser {
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    /// Only ever raises the flag; an existing admin is never demoted here.
    pub is_platform_admin: bool,
}

impl UpsertUser {
    pub fn validate(&self) -> SwitchboardResult<()> {
        validate::name("external_id", &self.external_id)?;
        validate::email(&self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role_label: Option<String>,
}

impl UpdateUser {
    pub fn validate(&self) -> SwitchboardResult<()> {
        if let Some(email) = &self.email {
            validate::email(email)?;
        }
        if let Some(name) = &self.display_name {
            validate::name("display_name", name)?;
        }
        Ok(())
    }
}
