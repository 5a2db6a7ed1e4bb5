//! SurrealDB implementation of [`RoleExceptionRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::permission::Permission;
use switchboard_core::models::role_exception::{
    CreateRoleException, ExceptionEffect, RoleException, UpdateRoleException,
};
use switchboard_core::repository::{PaginatedResult, Pagination, RoleExceptionRepository};
use uuid::Uuid;

use super::support::{CountRow, first, is_tenant_member, parse_uuid, total};
use crate::error::{CheckStatements, DbError};

#[derive(Debug, SurrealValue)]
struct RoleExceptionRow {
    record_id: String,
    tenant_id: String,
    user_id: String,
    permission: String,
    effect: String,
    reason: String,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_effect(s: &str) -> Result<ExceptionEffect, DbError> {
    match s {
        "allow" => Ok(ExceptionEffect::Allow),
        "deny" => Ok(ExceptionEffect::Deny),
        other => Err(DbError::Decode(format!("unknown exception effect: {other}"))),
    }
}

fn effect_to_string(effect: ExceptionEffect) -> String {
    match effect {
        ExceptionEffect::Allow => "allow".into(),
        ExceptionEffect::Deny => "deny".into(),
    }
}

impl RoleExceptionRow {
    fn try_into_exception(self) -> Result<RoleException, DbError> {
        let permission = self
            .permission
            .parse::<Permission>()
            .map_err(|e| DbError::Decode(format!("role_exception {}: {e}", self.record_id)))?;
        Ok(RoleException {
            id: parse_uuid("role_exception", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            permission,
            effect: parse_effect(&self.effect)?,
            reason: self.reason,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the RoleException repository.
#[derive(Clone)]
pub struct SurrealRoleExceptionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleExceptionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleExceptionRepository for SurrealRoleExceptionRepository<C> {
    async fn create(&self, input: CreateRoleException) -> SwitchboardResult<RoleException> {
        let tenant_id_str = input.tenant_id.to_string();
        let user_id_str = input.user_id.to_string();

        // Overrides only make sense for users who belong to the tenant.
        if !is_tenant_member(&self.db, input.tenant_id, input.user_id).await? {
            return Err(SwitchboardError::validation(
                "user is not a member of this tenant",
            ));
        }

        let id = Uuid::new_v4();

        let mut sets = vec![
            "tenant_id = $tenant_id",
            "user_id = $user_id",
            "permission = $permission",
            "effect = $effect",
            "reason = $reason",
        ];
        if input.valid_from.is_some() {
            sets.push("valid_from = $valid_from");
        }
        if input.valid_to.is_some() {
            sets.push("valid_to = $valid_to");
        }

        let query = format!(
            "CREATE type::record('role_exception', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('role_exception', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id_str))
            .bind(("user_id", user_id_str))
            .bind(("permission", input.permission.as_str().to_string()))
            .bind(("effect", effect_to_string(input.effect)))
            .bind(("reason", input.reason));

        if let Some(valid_from) = input.valid_from {
            builder = builder.bind(("valid_from", valid_from));
        }
        if let Some(valid_to) = input.valid_to {
            builder = builder.bind(("valid_to", valid_to));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("role_exception")?;

        let rows: Vec<RoleExceptionRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "role_exception", id)?.try_into_exception()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<RoleException> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('role_exception', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleExceptionRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "role_exception", id)?.try_into_exception()?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateRoleException,
    ) -> SwitchboardResult<RoleException> {
        let current = self.get_by_id(tenant_id, id).await?;
        input.validate_against(&current)?;

        let mut sets = Vec::new();
        if input.permission.is_some() {
            sets.push("permission = $permission");
        }
        if input.effect.is_some() {
            sets.push("effect = $effect");
        }
        if input.reason.is_some() {
            sets.push("reason = $reason");
        }
        match input.valid_from {
            Some(Some(_)) => sets.push("valid_from = $valid_from"),
            Some(None) => sets.push("valid_from = NONE"),
            None => {}
        }
        match input.valid_to {
            Some(Some(_)) => sets.push("valid_to = $valid_to"),
            Some(None) => sets.push("valid_to = NONE"),
            None => {}
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role_exception', $id) SET {} \
             WHERE tenant_id = $tenant_id; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('role_exception', $id) \
             WHERE tenant_id = $tenant_id;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(permission) = input.permission {
            builder = builder.bind(("permission", permission.as_str().to_string()));
        }
        if let Some(effect) = input.effect {
            builder = builder.bind(("effect", effect_to_string(effect)));
        }
        if let Some(reason) = input.reason {
            builder = builder.bind(("reason", reason));
        }
        if let Some(Some(valid_from)) = input.valid_from {
            builder = builder.bind(("valid_from", valid_from));
        }
        if let Some(Some(valid_to)) = input.valid_to {
            builder = builder.bind(("valid_to", valid_to));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("role_exception")?;

        let rows: Vec<RoleExceptionRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "role_exception", id)?.try_into_exception()?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<()> {
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query(
                "DELETE type::record('role_exception', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("role_exception")?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<RoleException>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM role_exception \
                 WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM role_exception \
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
        let rows: Vec<RoleExceptionRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(RoleExceptionRow::try_into_exception)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> SwitchboardResult<Vec<RoleException>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role_exception \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleExceptionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(RoleExceptionRow::try_into_exception)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
