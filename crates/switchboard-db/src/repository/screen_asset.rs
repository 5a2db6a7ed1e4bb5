//! SurrealDB implementation of [`ScreenAssetRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::screen_asset::{
    AssetType, CreateScreenAsset, ScreenAsset, UpdateScreenAsset,
};
use switchboard_core::repository::{PaginatedResult, Pagination, ScreenAssetRepository};
use uuid::Uuid;

use super::support::{
    CountRow, empty_object, entity_in_tenant, first, parse_opt_uuid, parse_uuid, total,
};
use crate::error::{CheckStatements, DbError};

#[derive(Debug, SurrealValue)]
struct ScreenAssetRow {
    record_id: String,
    tenant_id: String,
    name: String,
    asset_type: String,
    entity_id: Option<String>,
    configuration: serde_json::Value,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_asset_type(s: &str) -> Result<AssetType, DbError> {
    match s {
        "screen" => Ok(AssetType::Screen),
        "form" => Ok(AssetType::Form),
        "report" => Ok(AssetType::Report),
        "dashboard" => Ok(AssetType::Dashboard),
        other => Err(DbError::Decode(format!("unknown asset type: {other}"))),
    }
}

fn asset_type_to_string(asset_type: AssetType) -> String {
    match asset_type {
        AssetType::Screen => "screen".into(),
        AssetType::Form => "form".into(),
        AssetType::Report => "report".into(),
        AssetType::Dashboard => "dashboard".into(),
    }
}

impl ScreenAssetRow {
    fn try_into_asset(self) -> Result<ScreenAsset, DbError> {
        Ok(ScreenAsset {
            id: parse_uuid("screen_asset", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            asset_type: parse_asset_type(&self.asset_type)?,
            entity_id: parse_opt_uuid("entity", self.entity_id)?,
            configuration: self.configuration,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the ScreenAsset repository.
#[derive(Clone)]
pub struct SurrealScreenAssetRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealScreenAssetRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn require_entity(&self, tenant_id: Uuid, entity_id: Uuid) -> SwitchboardResult<()> {
        if entity_in_tenant(&self.db, tenant_id, entity_id).await? {
            Ok(())
        } else {
            Err(SwitchboardError::validation(format!(
                "entity {entity_id} does not exist in this tenant"
            )))
        }
    }
}

impl<C: Connection> ScreenAssetRepository for SurrealScreenAssetRepository<C> {
    async fn create(&self, input: CreateScreenAsset) -> SwitchboardResult<ScreenAsset> {
        if let Some(entity_id) = input.entity_id {
            self.require_entity(input.tenant_id, entity_id).await?;
        }

        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('screen_asset', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 asset_type = $asset_type, entity_id = $entity_id, \
                 configuration = $configuration; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('screen_asset', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("asset_type", asset_type_to_string(input.asset_type)))
            .bind(("entity_id", input.entity_id.map(|e| e.to_string())))
            .bind((
                "configuration",
                input.configuration.unwrap_or_else(empty_object),
            ))
            .await
            .map_err(DbError::from)?
            .check_statements("screen_asset")?;

        let rows: Vec<ScreenAssetRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "screen_asset", id)?.try_into_asset()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<ScreenAsset> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('screen_asset', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScreenAssetRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "screen_asset", id)?.try_into_asset()?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateScreenAsset,
    ) -> SwitchboardResult<ScreenAsset> {
        self.get_by_id(tenant_id, id).await?;
        if let Some(Some(entity_id)) = input.entity_id {
            self.require_entity(tenant_id, entity_id).await?;
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.asset_type.is_some() {
            sets.push("asset_type = $asset_type");
        }
        match input.entity_id {
            Some(Some(_)) => sets.push("entity_id = $entity_id"),
            Some(None) => sets.push("entity_id = NONE"),
            None => {}
        }
        if input.configuration.is_some() {
            sets.push("configuration = $configuration");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('screen_asset', $id) SET {} \
             WHERE tenant_id = $tenant_id; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('screen_asset', $id) \
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
        if let Some(asset_type) = input.asset_type {
            builder = builder.bind(("asset_type", asset_type_to_string(asset_type)));
        }
        if let Some(Some(entity_id)) = input.entity_id {
            builder = builder.bind(("entity_id", entity_id.to_string()));
        }
        if let Some(configuration) = input.configuration {
            builder = builder.bind(("configuration", configuration));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("screen_asset")?;

        let rows: Vec<ScreenAssetRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "screen_asset", id)?.try_into_asset()?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<()> {
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query(
                "DELETE type::record('screen_asset', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("screen_asset")?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<ScreenAsset>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM screen_asset \
                 WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM screen_asset \
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
        let rows: Vec<ScreenAssetRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(ScreenAssetRow::try_into_asset)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
