//! SurrealDB implementation of [`RoleRepository`].
//!
//! Role assignments are `has_role` graph edges from `user` to `role`.
//! Each edge carries the role's `tenant_id` and a stable
//! `assignment_id` so it can be addressed over the API.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::assignment::UserTenantRole;
use switchboard_core::models::permission::PermissionSet;
use switchboard_core::models::role::{CreateRole, Role, UpdateRole};
use switchboard_core::repository::{PaginatedResult, Pagination, RoleRepository};
use tracing::info;
use uuid::Uuid;

use super::support::{
    CountRow, TenantLocks, first, is_tenant_member, parse_uuid, record_exists, total,
};
use crate::error::{CheckStatements, DbError, THROWN_CONFLICT, THROWN_MISSING};

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    permissions: Vec<String>,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        let permissions = PermissionSet::parse(&self.permissions)
            .map_err(|e| DbError::Decode(format!("role {}: {e}", self.record_id)))?;
        Ok(Role {
            id: parse_uuid("role", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            description: self.description,
            permissions,
            is_system: self.is_system,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Projection of a `has_role` edge.
#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    assignment_id: String,
    tenant_id: String,
    user_id: String,
    role_id: String,
    created_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn try_into_assignment(self) -> Result<UserTenantRole, DbError> {
        Ok(UserTenantRole {
            id: parse_uuid("assignment", &self.assignment_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            role_id: parse_uuid("role", &self.role_id)?,
            created_at: self.created_at,
        })
    }
}

const ASSIGNMENT_PROJECTION: &str = "SELECT assignment_id, tenant_id, \
     meta::id(in) AS user_id, meta::id(out) AS role_id, created_at \
     FROM has_role";

/// SurrealDB implementation of the Role repository.
///
/// Deleting a role and assigning it are serialized per tenant. Clone the
/// repository rather than constructing a second one for the same store.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
    locks: TenantLocks,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            locks: TenantLocks::default(),
        }
    }

    async fn assignment_count(&self, user_id: Uuid, role_id: Uuid) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM has_role \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('role', $role_id) GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(total(rows))
    }

}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> SwitchboardResult<Role> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, description = $description, \
                 permissions = $permissions, is_system = $is_system; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('role', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("permissions", input.permissions.to_strings()))
            .bind(("is_system", input.is_system))
            .await
            .map_err(DbError::from)?
            .check_statements("role")?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "role", id)?.try_into_role()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<Role> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('role', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "role", id)?.try_into_role()?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateRole) -> SwitchboardResult<Role> {
        let current = self.get_by_id(tenant_id, id).await?;
        if current.is_system && input.permissions.is_some() {
            return Err(SwitchboardError::validation(
                "permissions of a system role cannot be changed",
            ));
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.permissions.is_some() {
            sets.push("permissions = $permissions");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {} \
             WHERE tenant_id = $tenant_id; \
             SELECT meta::id(id) AS record_id, * FROM type::record('role', $id) \
             WHERE tenant_id = $tenant_id;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(permissions) = input.permissions {
            builder = builder.bind(("permissions", permissions.to_strings()));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("role")?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "role", id)?.try_into_role()?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<()> {
        let role = self.get_by_id(tenant_id, id).await?;
        if role.is_system {
            return Err(SwitchboardError::validation("system roles cannot be deleted"));
        }

        let _guard = self.locks.acquire(tenant_id).await;

        // The holder count and the delete commit together, so an
        // assignment can never point at a deleted role.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $holders = array::len((SELECT VALUE id FROM has_role \
                 WHERE out = type::record('role', $id))); \
                 IF $holders > 0 { \
                 THROW string::concat($reason, <string> $holders, ' user(s)'); \
                 }; \
                 DELETE type::record('role', $id) WHERE tenant_id = $tenant_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind((
                "reason",
                format!("{THROWN_CONFLICT}role '{}' is still assigned to ", role.name),
            ))
            .await
            .map_err(DbError::from)?
            .check_statements("role")?;

        info!(tenant_id = %tenant_id, role_id = %id, "Role deleted");
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM role \
                 WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> SwitchboardResult<UserTenantRole> {
        let _guard = self.locks.acquire(tenant_id).await;

        // A role from another tenant is reported as missing.
        self.get_by_id(tenant_id, role_id).await?;
        if !record_exists(&self.db, "user", user_id).await? {
            return Err(SwitchboardError::not_found("user", user_id));
        }
        if self.assignment_count(user_id, role_id).await? > 0 {
            return Err(SwitchboardError::AlreadyExists {
                entity: "role assignment".into(),
            });
        }

        let user_id_str = user_id.to_string();
        let role_id_str = role_id.to_string();
        let assignment_id = Uuid::new_v4();

        // The role is checked again in the same transaction as the edge.
        let query = format!(
            "BEGIN TRANSACTION; \
             IF array::len((SELECT VALUE id FROM type::record('role', $role_id) \
             WHERE tenant_id = $tenant_id)) = 0 {{ THROW $missing; }}; \
             RELATE user:`{user_id_str}` -> has_role -> role:`{role_id_str}` \
             SET assignment_id = $assignment_id, tenant_id = $tenant_id; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("role_id", role_id_str))
            .bind(("assignment_id", assignment_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("missing", format!("{THROWN_MISSING}role {role_id}")))
            .await
            .map_err(DbError::from)?
            .check_statements("role assignment")?;

        let mut result = self
            .db
            .query(format!(
                "{ASSIGNMENT_PROJECTION} WHERE assignment_id = $assignment_id"
            ))
            .bind(("assignment_id", assignment_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let assignment = first(rows, "role assignment", assignment_id)?.try_into_assignment()?;

        info!(
            tenant_id = %tenant_id,
            user_id = %user_id,
            role_id = %role_id,
            "Role assigned"
        );
        Ok(assignment)
    }

    async fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> SwitchboardResult<()> {
        self.get_by_id(tenant_id, role_id).await?;
        if self.assignment_count(user_id, role_id).await? == 0 {
            return Err(SwitchboardError::not_found(
                "role assignment",
                format!("user={user_id},role={role_id}"),
            ));
        }

        self.db
            .query(
                "DELETE has_role WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('role', $role_id) AND \
                 tenant_id = $tenant_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("role assignment")?;

        info!(
            tenant_id = %tenant_id,
            user_id = %user_id,
            role_id = %role_id,
            "Role unassigned"
        );
        Ok(())
    }

    async fn get_user_roles(&self, tenant_id: Uuid, user_id: Uuid) -> SwitchboardResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE tenant_id = $tenant_id \
                 AND id IN (\
                     SELECT VALUE out FROM has_role \
                     WHERE in = type::record('user', $user_id) \
                     AND tenant_id = $tenant_id\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn list_assignments(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<UserTenantRole>> {
        let query = format!(
            "SELECT count() AS total FROM has_role \
             WHERE tenant_id = $tenant_id GROUP ALL; \
             {ASSIGNMENT_PROJECTION} WHERE tenant_id = $tenant_id \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset;"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<AssignmentRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(AssignmentRow::try_into_assignment)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn is_member(&self, tenant_id: Uuid, user_id: Uuid) -> SwitchboardResult<bool> {
        Ok(is_tenant_member(&self.db, tenant_id, user_id).await?)
    }
}
