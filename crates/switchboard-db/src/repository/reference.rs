//! SurrealDB implementation of [`ReferenceRepository`].
//!
//! Countries, currencies, languages and cities share the
//! `reference_item` table, keyed by `(kind, code)`.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::reference::{
    CreateReferenceItem, ReferenceItem, ReferenceKind, UpdateReferenceItem,
};
use switchboard_core::repository::{PaginatedResult, Pagination, ReferenceRepository};
use uuid::Uuid;

use super::support::{CountRow, first, parse_uuid, total};
use crate::error::{CheckStatements, DbError};

#[derive(Debug, SurrealValue)]
struct ReferenceRow {
    record_id: String,
    kind: String,
    code: String,
    name: String,
    parent_code: Option<String>,
    symbol: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<ReferenceKind, DbError> {
    match s {
        "country" => Ok(ReferenceKind::Country),
        "currency" => Ok(ReferenceKind::Currency),
        "language" => Ok(ReferenceKind::Language),
        "city" => Ok(ReferenceKind::City),
        other => Err(DbError::Decode(format!("unknown reference kind: {other}"))),
    }
}

impl ReferenceRow {
    fn try_into_item(self) -> Result<ReferenceItem, DbError> {
        Ok(ReferenceItem {
            id: parse_uuid("reference_item", &self.record_id)?,
            kind: parse_kind(&self.kind)?,
            code: self.code,
            name: self.name,
            parent_code: self.parent_code,
            symbol: self.symbol,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Reference repository.
#[derive(Clone)]
pub struct SurrealReferenceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealReferenceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count_children(&self, country_code: &str) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM reference_item \
                 WHERE kind = 'city' AND parent_code = $code GROUP ALL",
            )
            .bind(("code", country_code.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(total(rows))
    }
}

impl<C: Connection> ReferenceRepository for SurrealReferenceRepository<C> {
    async fn create(
        &self,
        kind: ReferenceKind,
        input: CreateReferenceItem,
    ) -> SwitchboardResult<ReferenceItem> {
        let code = kind.normalize_code(&input.code);
        let parent_code = input
            .parent_code
            .as_deref()
            .map(|c| ReferenceKind::Country.normalize_code(c));

        if kind == ReferenceKind::City
            && let Some(country) = &parent_code
        {
            match self.get_by_code(ReferenceKind::Country, country).await {
                Ok(_) => {}
                Err(SwitchboardError::NotFound { .. }) => {
                    return Err(SwitchboardError::validation(format!(
                        "unknown country code: {country}"
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('reference_item', $id) SET \
                 kind = $kind, code = $code, name = $name, \
                 parent_code = $parent_code, symbol = $symbol; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('reference_item', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("kind", kind.as_str().to_string()))
            .bind(("code", code))
            .bind(("name", input.name))
            .bind(("parent_code", parent_code))
            .bind(("symbol", input.symbol))
            .await
            .map_err(DbError::from)?
            .check_statements(kind.as_str())?;

        let rows: Vec<ReferenceRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, kind.as_str(), id)?.try_into_item()?)
    }

    async fn get_by_id(&self, kind: ReferenceKind, id: Uuid) -> SwitchboardResult<ReferenceItem> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('reference_item', $id) WHERE kind = $kind",
            )
            .bind(("id", id.to_string()))
            .bind(("kind", kind.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReferenceRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, kind.as_str(), id)?.try_into_item()?)
    }

    async fn get_by_code(&self, kind: ReferenceKind, code: &str) -> SwitchboardResult<ReferenceItem> {
        let code = kind.normalize_code(code);
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM reference_item \
                 WHERE kind = $kind AND code = $code",
            )
            .bind(("kind", kind.as_str().to_string()))
            .bind(("code", code.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReferenceRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, kind.as_str(), format!("code={code}"))?.try_into_item()?)
    }

    async fn update(
        &self,
        kind: ReferenceKind,
        id: Uuid,
        input: UpdateReferenceItem,
    ) -> SwitchboardResult<ReferenceItem> {
        self.get_by_id(kind, id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.symbol.is_some() {
            sets.push("symbol = $symbol");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('reference_item', $id) SET {} WHERE kind = $kind; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('reference_item', $id) WHERE kind = $kind;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("kind", kind.as_str().to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(symbol) = input.symbol {
            builder = builder.bind(("symbol", symbol));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements(kind.as_str())?;

        let rows: Vec<ReferenceRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, kind.as_str(), id)?.try_into_item()?)
    }

    async fn delete(&self, kind: ReferenceKind, id: Uuid) -> SwitchboardResult<()> {
        let item = self.get_by_id(kind, id).await?;

        if kind == ReferenceKind::Country {
            let cities = self.count_children(&item.code).await?;
            if cities > 0 {
                return Err(SwitchboardError::conflict(format!(
                    "country {} still has {cities} cities",
                    item.code
                )));
            }
        }

        self.db
            .query("DELETE type::record('reference_item', $id) WHERE kind = $kind")
            .bind(("id", id.to_string()))
            .bind(("kind", kind.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements(kind.as_str())?;

        Ok(())
    }

    async fn list(
        &self,
        kind: ReferenceKind,
        parent_code: Option<String>,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<ReferenceItem>> {
        let where_clause = if parent_code.is_some() {
            "kind = $kind AND parent_code = $parent_code"
        } else {
            "kind = $kind"
        };

        let query = format!(
            "SELECT count() AS total FROM reference_item \
             WHERE {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM reference_item \
             WHERE {where_clause} \
             ORDER BY name ASC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("kind", kind.as_str().to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(parent_code) = parent_code {
            builder = builder.bind((
                "parent_code",
                ReferenceKind::Country.normalize_code(&parent_code),
            ));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<ReferenceRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(ReferenceRow::try_into_item)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
