//! User × tenant × role assignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grants `user_id` the role `role_id` within `tenant_id`.
///
/// A user may hold several distinct roles in one tenant; the same
/// triple is stored at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTenantRole {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub created_at: DateTime<Utc>,
}
