//! Per-user permission overrides layered on top of role grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SwitchboardError, SwitchboardResult};
use crate::models::permission::Permission;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionEffect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleException {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub permission: Permission,
    pub effect: ExceptionEffect,
    pub reason: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleException {
    /// Whether the override applies at `now`. The window is half-open:
    /// `valid_from <= now < valid_to`.
    pub fn is_in_effect(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from.is_none_or(|from| from <= now)
            && self.valid_to.is_none_or(|to| now < to)
    }
}

fn check_window(
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
) -> SwitchboardResult<()> {
    match (valid_from, valid_to) {
        (Some(from), Some(to)) if from > to => Err(SwitchboardError::validation(
            "valid_from must not be after valid_to",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleException {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub permission: Permission,
    pub effect: ExceptionEffect,
    #[serde(default)]
    pub reason: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl CreateRoleException {
    pub fn validate(&self) -> SwitchboardResult<()> {
        check_window(self.valid_from, self.valid_to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRoleException {
    pub permission: Option<Permission>,
    pub effect: Option<ExceptionEffect>,
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub valid_from: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub valid_to: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

impl UpdateRoleException {
    /// Validate the window that results from applying this update to
    /// `current`.
    pub fn validate_against(&self, current: &RoleException) -> SwitchboardResult<()> {
        let from = self.valid_from.unwrap_or(current.valid_from);
        let to = self.valid_to.unwrap_or(current.valid_to);
        check_window(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn exception(from: Option<i64>, to: Option<i64>, active: bool) -> RoleException {
        let now = Utc::now();
        RoleException {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            permission: Permission::AuditView,
            effect: ExceptionEffect::Allow,
            reason: String::new(),
            valid_from: from.map(|h| now + Duration::hours(h)),
            valid_to: to.map(|h| now + Duration::hours(h)),
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn open_window_is_in_effect() {
        assert!(exception(None, None, true).is_in_effect(Utc::now()));
    }

    #[test]
    fn inactive_is_never_in_effect() {
        assert!(!exception(None, None, false).is_in_effect(Utc::now()));
    }

    #[test]
    fn window_bounds() {
        let now = Utc::now();
        assert!(exception(Some(-1), Some(1), true).is_in_effect(now));
        assert!(!exception(Some(1), None, true).is_in_effect(now));
        assert!(!exception(None, Some(-1), true).is_in_effect(now));
    }

    #[test]
    fn inverted_window_rejected() {
        let now = Utc::now();
        let input = CreateRoleException {
            tenant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            permission: Permission::AuditView,
            effect: ExceptionEffect::Deny,
            reason: String::new(),
            valid_from: Some(now),
            valid_to: Some(now - Duration::minutes(1)),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let update: UpdateRoleException =
            serde_json::from_value(serde_json::json!({ "valid_to": null })).unwrap();
        assert_eq!(update.valid_to, Some(None));
        assert_eq!(update.valid_from, None);
    }
}
