//! SurrealDB implementation of [`TenantRepository`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::permission::PermissionSet;
use switchboard_core::models::role::ADMINISTRATOR_ROLE;
use switchboard_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use switchboard_core::repository::{PaginatedResult, Pagination, TenantRepository};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::support::{CountRow, first, parse_uuid, record_exists, total};
use crate::error::{CheckStatements, DbError};

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    record_id: String,
    name: String,
    slug: String,
    description: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id: parse_uuid("tenant", &self.record_id)?,
            name: self.name,
            slug: self.slug,
            description: self.description,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Tables whose rows carry a `tenant_id` and go away with the tenant.
/// Log tables are append-only and keep their history.
const TENANT_SCOPED_TABLES: &[&str] = &[
    "has_role",
    "role",
    "role_exception",
    "team_membership",
    "team",
    "screen_asset",
    "transaction_instance",
    "transaction_definition",
    "entity",
];

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
    /// Slugs are global, so creates are serialized across all tenants.
    create_lock: Arc<Mutex<()>>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            create_lock: Arc::default(),
        }
    }

    async fn slug_taken(&self, slug: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM tenant WHERE slug = $slug GROUP ALL")
            .bind(("slug", slug.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(total(rows) > 0)
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant, owner_id: Uuid) -> SwitchboardResult<Tenant> {
        let _guard = self.create_lock.lock().await;
        if self.slug_taken(&input.slug).await? {
            return Err(SwitchboardError::AlreadyExists {
                entity: "tenant".into(),
            });
        }
        if !record_exists(&self.db, "user", owner_id).await? {
            return Err(SwitchboardError::not_found("user", owner_id));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let role_id_str = Uuid::new_v4().to_string();
        let owner_id_str = owner_id.to_string();

        // Tenant, administrator role and the owner's assignment commit
        // together or not at all. RELATE needs literal record ids; the
        // embedded values are generated UUIDs.
        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('tenant', $id) SET \
             name = $name, slug = $slug, description = $description; \
             CREATE type::record('role', $role_id) SET \
             tenant_id = $id, name = $role_name, \
             description = $role_description, \
             permissions = $permissions, is_system = true; \
             RELATE user:`{owner_id_str}` -> has_role -> role:`{role_id_str}` \
             SET assignment_id = $assignment_id, tenant_id = $id; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .bind(("description", input.description))
            .bind(("role_id", role_id_str))
            .bind(("role_name", ADMINISTRATOR_ROLE.to_string()))
            .bind((
                "role_description",
                "Full access to every module".to_string(),
            ))
            .bind(("permissions", PermissionSet::all().to_strings()))
            .bind(("assignment_id", Uuid::new_v4().to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("tenant")?;

        info!(tenant_id = %id, owner_id = %owner_id, "Tenant created");

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> SwitchboardResult<Tenant> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('tenant', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "tenant", id)?.try_into_tenant()?)
    }

    async fn get_by_slug(&self, slug: &str) -> SwitchboardResult<Tenant> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM tenant WHERE slug = $slug")
            .bind(("slug", slug.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "tenant", format!("slug={slug}"))?.try_into_tenant()?)
    }

    async fn update(&self, id: Uuid, input: UpdateTenant) -> SwitchboardResult<Tenant> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('tenant', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('tenant', $id);",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("tenant")?;

        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "tenant", id)?.try_into_tenant()?)
    }

    async fn delete(&self, id: Uuid) -> SwitchboardResult<()> {
        // Surface NotFound before running the cascade.
        self.get_by_id(id).await?;

        let mut query = String::from("BEGIN TRANSACTION; ");
        for table in TENANT_SCOPED_TABLES {
            query.push_str(&format!("DELETE {table} WHERE tenant_id = $id; "));
        }
        query.push_str("DELETE type::record('tenant', $id); COMMIT TRANSACTION;");

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("tenant")?;

        info!(tenant_id = %id, "Tenant deleted");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> SwitchboardResult<PaginatedResult<Tenant>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM tenant GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM tenant \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset;",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(TenantRow::try_into_tenant)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_for_user(&self, user_id: Uuid) -> SwitchboardResult<Vec<Tenant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant \
                 WHERE meta::id(id) IN (\
                     SELECT VALUE tenant_id FROM has_role \
                     WHERE in = type::record('user', $user_id)\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(TenantRow::try_into_tenant)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
