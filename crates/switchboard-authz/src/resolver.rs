//! Effective-permission resolution.

use chrono::{DateTime, Utc};
use switchboard_core::models::permission::PermissionSet;
use switchboard_core::models::role::Role;
use switchboard_core::models::role_exception::{ExceptionEffect, RoleException};

/// Resolve what a user may do in a tenant.
///
/// The union of the held roles' permissions, plus every `allow`
/// exception in effect at `now`, minus every `deny` exception in effect
/// at `now`. A deny wins over an allow for the same permission.
pub fn resolve_permissions(
    roles: &[Role],
    exceptions: &[RoleException],
    now: DateTime<Utc>,
) -> PermissionSet {
    let mut permissions = PermissionSet::new();
    for role in roles {
        permissions.extend(&role.permissions);
    }

    let in_effect: Vec<&RoleException> =
        exceptions.iter().filter(|e| e.is_in_effect(now)).collect();

    for exception in in_effect.iter().filter(|e| e.effect == ExceptionEffect::Allow) {
        permissions.insert(exception.permission);
    }
    for exception in in_effect.iter().filter(|e| e.effect == ExceptionEffect::Deny) {
        permissions.remove(exception.permission);
    }

    permissions
}
