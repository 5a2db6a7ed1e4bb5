//! SurrealDB implementation of [`EntityRepository`].
//!
//! Entities form a per-tenant tree through `parent_entity_id`. Every
//! write that sets a parent walks the parent chain, so a cycle or a tree
//! deeper than [`MAX_ENTITY_DEPTH`] is never stored. Writes that change
//! the shape of a tenant's tree hold that tenant's lock from the walk to
//! the commit.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::entity::{CreateEntity, Entity, MAX_ENTITY_DEPTH, UpdateEntity};
use switchboard_core::repository::{EntityRepository, PaginatedResult, Pagination};
use uuid::Uuid;

use super::support::{
    CountRow, TenantLocks, empty_object, first, parse_opt_uuid, parse_uuid, total,
};
use crate::error::{CheckStatements, DbError, THROWN_CONFLICT};

#[derive(Debug, SurrealValue)]
struct EntityRow {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    parent_entity_id: Option<String>,
    field_schema: serde_json::Value,
    record_count: u64,
    last_modified: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntityRow {
    fn try_into_entity(self) -> Result<Entity, DbError> {
        Ok(Entity {
            id: parse_uuid("entity", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            description: self.description,
            parent_entity_id: parse_opt_uuid("parent entity", self.parent_entity_id)?,
            schema: self.field_schema,
            record_count: self.record_count,
            last_modified: self.last_modified,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

/// SurrealDB implementation of the Entity repository.
#[derive(Clone)]
pub struct SurrealEntityRepository<C: Connection> {
    db: Surreal<C>,
    locks: TenantLocks,
}

impl<C: Connection> SurrealEntityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            locks: TenantLocks::default(),
        }
    }

    /// `start` followed by its ancestors, nearest first. Fails once the
    /// walk exceeds the depth cap, which also stops on a stored cycle.
    async fn chain_from(&self, tenant_id: Uuid, start: Uuid) -> SwitchboardResult<Vec<Entity>> {
        let mut chain = Vec::new();
        let mut next = Some(start);
        while let Some(id) = next {
            if chain.len() >= MAX_ENTITY_DEPTH {
                return Err(too_deep());
            }
            let entity = self.get_by_id(tenant_id, id).await?;
            next = entity.parent_entity_id;
            chain.push(entity);
        }
        Ok(chain)
    }

    /// Chain of a prospective parent. Its length is the depth of the
    /// parent, counting the root as 1.
    async fn parent_chain(&self, tenant_id: Uuid, parent_id: Uuid) -> SwitchboardResult<Vec<Entity>> {
        match self.chain_from(tenant_id, parent_id).await {
            Ok(chain) => Ok(chain),
            Err(SwitchboardError::NotFound { .. }) => Err(SwitchboardError::validation(
                "parent entity does not exist in this tenant",
            )),
            Err(e) => Err(e),
        }
    }

    /// Number of levels in the subtree rooted at `id`, itself included.
    async fn subtree_height(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<usize> {
        let mut height = 1;
        let mut level = vec![id.to_string()];
        loop {
            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id FROM entity \
                     WHERE tenant_id = $tenant_id AND parent_entity_id IN $parents",
                )
                .bind(("tenant_id", tenant_id.to_string()))
                .bind(("parents", level))
                .await
                .map_err(DbError::from)?;
            let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
            if rows.is_empty() {
                return Ok(height);
            }
            height += 1;
            if height > MAX_ENTITY_DEPTH {
                return Ok(height);
            }
            level = rows.into_iter().map(|r| r.record_id).collect();
        }
    }

}

fn too_deep() -> SwitchboardError {
    SwitchboardError::validation(format!(
        "entity tree exceeds the maximum depth of {MAX_ENTITY_DEPTH}"
    ))
}

impl<C: Connection> EntityRepository for SurrealEntityRepository<C> {
    async fn create(&self, input: CreateEntity) -> SwitchboardResult<Entity> {
        let _guard = match input.parent_entity_id {
            Some(_) => Some(self.locks.acquire(input.tenant_id).await),
            None => None,
        };
        if let Some(parent_id) = input.parent_entity_id
            && self.parent_chain(input.tenant_id, parent_id).await?.len() + 1 > MAX_ENTITY_DEPTH
        {
            return Err(too_deep());
        }

        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('entity', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, description = $description, \
                 parent_entity_id = $parent_entity_id, \
                 field_schema = $field_schema; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('entity', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind((
                "parent_entity_id",
                input.parent_entity_id.map(|p| p.to_string()),
            ))
            .bind(("field_schema", input.schema.unwrap_or_else(empty_object)))
            .await
            .map_err(DbError::from)?
            .check_statements("entity")?;

        let rows: Vec<EntityRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "entity", id)?.try_into_entity()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<Entity> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('entity', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EntityRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "entity", id)?.try_into_entity()?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateEntity,
    ) -> SwitchboardResult<Entity> {
        let _guard = match input.parent_entity_id {
            Some(_) => Some(self.locks.acquire(tenant_id).await),
            None => None,
        };
        self.get_by_id(tenant_id, id).await?;

        if let Some(Some(parent_id)) = input.parent_entity_id {
            if parent_id == id {
                return Err(SwitchboardError::validation(
                    "an entity cannot be its own parent",
                ));
            }
            let chain = self.parent_chain(tenant_id, parent_id).await?;
            if chain.iter().any(|ancestor| ancestor.id == id) {
                return Err(SwitchboardError::validation(
                    "re-parenting would create a cycle in the entity tree",
                ));
            }
            if chain.len() + self.subtree_height(tenant_id, id).await? > MAX_ENTITY_DEPTH {
                return Err(too_deep());
            }
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        match input.parent_entity_id {
            Some(Some(_)) => sets.push("parent_entity_id = $parent_entity_id"),
            Some(None) => sets.push("parent_entity_id = NONE"),
            None => {}
        }
        if input.schema.is_some() {
            sets.push("field_schema = $field_schema");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('entity', $id) SET {} \
             WHERE tenant_id = $tenant_id; \
             SELECT meta::id(id) AS record_id, * FROM type::record('entity', $id) \
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
        if let Some(Some(parent_id)) = input.parent_entity_id {
            builder = builder.bind(("parent_entity_id", parent_id.to_string()));
        }
        if let Some(schema) = input.schema {
            builder = builder.bind(("field_schema", schema));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("entity")?;

        let rows: Vec<EntityRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "entity", id)?.try_into_entity()?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<()> {
        let _guard = self.locks.acquire(tenant_id).await;
        let entity = self.get_by_id(tenant_id, id).await?;

        // Both guards run inside the transaction that deletes the entity.
        // Screen assets outlive the entity they were bound to.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $children = array::len((SELECT VALUE id FROM entity \
                 WHERE tenant_id = $tenant_id AND parent_entity_id = $id)); \
                 IF $children > 0 { \
                 THROW string::concat($prefix, 'still has ', <string> $children, ' child entities'); \
                 }; \
                 LET $definitions = array::len((SELECT VALUE id FROM transaction_definition \
                 WHERE tenant_id = $tenant_id \
                 AND (source_entity_id = $id OR target_entity_id = $id))); \
                 IF $definitions > 0 { \
                 THROW string::concat($prefix, 'is referenced by ', <string> $definitions, ' transaction definitions'); \
                 }; \
                 UPDATE screen_asset SET entity_id = NONE, updated_at = time::now() \
                 WHERE tenant_id = $tenant_id AND entity_id = $id; \
                 DELETE type::record('entity', $id) WHERE tenant_id = $tenant_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind((
                "prefix",
                format!("{THROWN_CONFLICT}entity '{}' ", entity.name),
            ))
            .await
            .map_err(DbError::from)?
            .check_statements("entity")?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<Entity>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM entity \
                 WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM entity \
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
        let rows: Vec<EntityRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(EntityRow::try_into_entity)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn get_children(&self, tenant_id: Uuid, parent_id: Uuid) -> SwitchboardResult<Vec<Entity>> {
        self.get_by_id(tenant_id, parent_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM entity \
                 WHERE tenant_id = $tenant_id AND parent_entity_id = $parent_id \
                 ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("parent_id", parent_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EntityRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(EntityRow::try_into_entity)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn get_ancestors(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<Vec<Entity>> {
        let mut chain = self.chain_from(tenant_id, id).await?;
        chain.remove(0);
        Ok(chain)
    }

    async fn record_usage(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        delta: i64,
    ) -> SwitchboardResult<Entity> {
        self.get_by_id(tenant_id, id).await?;

        let mut result = self
            .db
            .query(
                "UPDATE type::record('entity', $id) SET \
                 record_count = math::max([0, record_count + $delta]), \
                 last_modified = time::now(), updated_at = time::now() \
                 WHERE tenant_id = $tenant_id; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('entity', $id) \
                 WHERE tenant_id = $tenant_id;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("delta", delta))
            .await
            .map_err(DbError::from)?
            .check_statements("entity")?;

        let rows: Vec<EntityRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "entity", id)?.try_into_entity()?)
    }
}
