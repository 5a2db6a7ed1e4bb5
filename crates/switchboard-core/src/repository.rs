//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation: a record
//! that exists under another tenant is reported as not found.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SwitchboardResult;
use crate::models::{
    assignment::UserTenantRole,
    audit::{CreateHealthCheck, CreateLogEntry, HealthCheck, LogCategory, LogEntry},
    entity::{CreateEntity, Entity, UpdateEntity},
    reference::{CreateReferenceItem, ReferenceItem, ReferenceKind, UpdateReferenceItem},
    role::{CreateRole, Role, UpdateRole},
    role_exception::{CreateRoleException, RoleException, UpdateRoleException},
    screen_asset::{CreateScreenAsset, ScreenAsset, UpdateScreenAsset},
    team::{CreateTeam, Team, TeamMembership, TeamRole, UpdateTeam},
    tenant::{CreateTenant, Tenant, UpdateTenant},
    transaction::{
        CreateTransactionDefinition, CreateTransactionInstance, TransactionDefinition,
        TransactionInstance, TransactionStatus, UpdateTransactionDefinition,
        UpdateTransactionStatus,
    },
    user::{UpdateUser, UpsertUser, User},
};

/// Upper bound applied to every requested page size.
pub const MAX_PAGE_SIZE: u64 = 200;

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

impl Pagination {
    /// Clamp `limit` into `1..=MAX_PAGE_SIZE`.
    pub fn clamped(self) -> Self {
        Self {
            offset: self.offset,
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Identity (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    /// Create a tenant, seed its `Administrator` system role and assign
    /// that role to `owner_id`, all in one transaction.
    fn create(
        &self,
        input: CreateTenant,
        owner_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SwitchboardResult<Tenant>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = SwitchboardResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = SwitchboardResult<Tenant>> + Send;
    /// Hard delete: removes the tenant and every row scoped to it.
    fn delete(&self, id: Uuid) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<Tenant>>> + Send;
    /// Tenants in which the user holds at least one role.
    fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Vec<Tenant>>> + Send;
}

pub trait UserRepository: Send + Sync {
    /// Create on first sign-in, otherwise refresh the profile and
    /// `last_login_at`.
    fn upsert(&self, input: UpsertUser) -> impl Future<Output = SwitchboardResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SwitchboardResult<User>> + Send;
    fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> impl Future<Output = SwitchboardResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = SwitchboardResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = SwitchboardResult<User>> + Send;
    /// Soft-delete: sets `is_active` to false.
    fn deactivate(&self, id: Uuid) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Authorization (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = SwitchboardResult<Role>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Role>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = SwitchboardResult<Role>> + Send;
    /// Fails with `Conflict` while any user still holds the role, and
    /// with `Validation` for system roles.
    fn delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<Role>>> + Send;

    /// Grant a role to a user within the role's tenant.
    fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<UserTenantRole>> + Send;

    /// Remove a role assignment from a user.
    fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;

    /// All roles a user holds in the tenant.
    fn get_user_roles(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Vec<Role>>> + Send;

    /// Every assignment in the tenant.
    fn list_assignments(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<UserTenantRole>>> + Send;

    /// Whether the user holds any role in the tenant.
    fn is_member(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<bool>> + Send;
}

pub trait RoleExceptionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRoleException,
    ) -> impl Future<Output = SwitchboardResult<RoleException>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<RoleException>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateRoleException,
    ) -> impl Future<Output = SwitchboardResult<RoleException>> + Send;
    fn delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<RoleException>>> + Send;
    /// Every exception recorded for the user, in effect or not.
    fn list_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Vec<RoleException>>> + Send;
}

// ---------------------------------------------------------------------------
// Teams (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait TeamRepository: Send + Sync {
    fn create(&self, input: CreateTeam) -> impl Future<Output = SwitchboardResult<Team>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Team>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateTeam,
    ) -> impl Future<Output = SwitchboardResult<Team>> + Send;
    /// Soft-delete: deactivates the team and all of its memberships.
    fn delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<Team>>> + Send;

    /// Add a user to a team, re-activating a previous membership row if
    /// one exists.
    fn add_member(
        &self,
        tenant_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> impl Future<Output = SwitchboardResult<TeamMembership>> + Send;

    /// Deactivate a membership. The row is kept.
    fn remove_member(
        &self,
        tenant_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;

    /// Active memberships only.
    fn get_team_members(
        &self,
        tenant_id: Uuid,
        team_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Vec<TeamMembership>>> + Send;

    /// Direct lookup, active or not.
    fn get_membership(
        &self,
        tenant_id: Uuid,
        membership_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<TeamMembership>> + Send;

    /// Teams in which the user has an active membership.
    fn get_user_teams(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Vec<Team>>> + Send;
}

// ---------------------------------------------------------------------------
// Dynamic business objects (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait EntityRepository: Send + Sync {
    fn create(
        &self,
        input: CreateEntity,
    ) -> impl Future<Output = SwitchboardResult<Entity>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Entity>> + Send;
    /// Re-parenting is cycle-checked and depth-bounded.
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateEntity,
    ) -> impl Future<Output = SwitchboardResult<Entity>> + Send;
    /// Fails with `Conflict` while children or transaction definitions
    /// reference the entity.
    fn delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<Entity>>> + Send;

    /// Direct children of an entity.
    fn get_children(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Vec<Entity>>> + Send;

    /// Ancestors of an entity, nearest first.
    fn get_ancestors(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<Vec<Entity>>> + Send;

    /// Adjust `record_count` by `delta` (saturating at zero) and stamp
    /// `last_modified`.
    fn record_usage(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        delta: i64,
    ) -> impl Future<Output = SwitchboardResult<Entity>> + Send;
}

pub trait ScreenAssetRepository: Send + Sync {
    fn create(
        &self,
        input: CreateScreenAsset,
    ) -> impl Future<Output = SwitchboardResult<ScreenAsset>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<ScreenAsset>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateScreenAsset,
    ) -> impl Future<Output = SwitchboardResult<ScreenAsset>> + Send;
    fn delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<ScreenAsset>>> + Send;
}

pub trait TransactionDefinitionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateTransactionDefinition,
    ) -> impl Future<Output = SwitchboardResult<TransactionDefinition>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<TransactionDefinition>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateTransactionDefinition,
    ) -> impl Future<Output = SwitchboardResult<TransactionDefinition>> + Send;
    /// Removes the definition and its instances.
    fn delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<TransactionDefinition>>> + Send;
}

/// Query filters for transaction instances.
#[derive(Debug, Clone, Default)]
pub struct TransactionInstanceFilter {
    pub definition_id: Option<Uuid>,
    pub status: Option<TransactionStatus>,
}

pub trait TransactionInstanceRepository: Send + Sync {
    fn create(
        &self,
        input: CreateTransactionInstance,
    ) -> impl Future<Output = SwitchboardResult<TransactionInstance>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<TransactionInstance>> + Send;
    /// Set the status. No transition rules are enforced.
    fn update_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateTransactionStatus,
    ) -> impl Future<Output = SwitchboardResult<TransactionInstance>> + Send;
    fn delete(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        filter: TransactionInstanceFilter,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<TransactionInstance>>> + Send;
}

// ---------------------------------------------------------------------------
// Reference data (global scope)
// ---------------------------------------------------------------------------

pub trait ReferenceRepository: Send + Sync {
    fn create(
        &self,
        kind: ReferenceKind,
        input: CreateReferenceItem,
    ) -> impl Future<Output = SwitchboardResult<ReferenceItem>> + Send;
    fn get_by_id(
        &self,
        kind: ReferenceKind,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<ReferenceItem>> + Send;
    fn get_by_code(
        &self,
        kind: ReferenceKind,
        code: &str,
    ) -> impl Future<Output = SwitchboardResult<ReferenceItem>> + Send;
    fn update(
        &self,
        kind: ReferenceKind,
        id: Uuid,
        input: UpdateReferenceItem,
    ) -> impl Future<Output = SwitchboardResult<ReferenceItem>> + Send;
    fn delete(
        &self,
        kind: ReferenceKind,
        id: Uuid,
    ) -> impl Future<Output = SwitchboardResult<()>> + Send;
    /// List items of a kind, optionally restricted to one parent code
    /// (cities of a country).
    fn list(
        &self,
        kind: ReferenceKind,
        parent_code: Option<String>,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<ReferenceItem>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit & monitoring (append-only)
// ---------------------------------------------------------------------------

/// Query filters for log entries.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub category: Option<LogCategory>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateLogEntry,
    ) -> impl Future<Output = SwitchboardResult<LogEntry>> + Send;
    /// Most recent first.
    fn list(
        &self,
        filter: LogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = SwitchboardResult<PaginatedResult<LogEntry>>> + Send;
}

pub trait HealthCheckRepository: Send + Sync {
    fn record(
        &self,
        input: CreateHealthCheck,
    ) -> impl Future<Output = SwitchboardResult<HealthCheck>> + Send;
    /// Most recent first.
    fn list_recent(
        &self,
        limit: u64,
    ) -> impl Future<Output = SwitchboardResult<Vec<HealthCheck>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            offset: 10,
            limit: 10_000,
        }
        .clamped();
        assert_eq!(p.limit, MAX_PAGE_SIZE);
        assert_eq!(p.offset, 10);

        let p = Pagination {
            offset: 0,
            limit: 0,
        }
        .clamped();
        assert_eq!(p.limit, 1);
    }
}
