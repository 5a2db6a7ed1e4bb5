//! SurrealDB implementations of [`TransactionDefinitionRepository`] and
//! [`TransactionInstanceRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::models::transaction::{
    CreateTransactionDefinition, CreateTransactionInstance, TransactionDefinition,
    TransactionInstance, TransactionStatus, UpdateTransactionDefinition, UpdateTransactionStatus,
};
use switchboard_core::repository::{
    PaginatedResult, Pagination, TransactionDefinitionRepository, TransactionInstanceFilter,
    TransactionInstanceRepository,
};
use tracing::debug;
use uuid::Uuid;

use super::support::{CountRow, empty_object, entity_in_tenant, first, parse_uuid, total};
use crate::error::{CheckStatements, DbError};

// -----------------------------------------------------------------------
// Row structs
// -----------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct DefinitionRow {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    source_entity_id: String,
    target_entity_id: String,
    workflow: serde_json::Value,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DefinitionRow {
    fn try_into_definition(self) -> Result<TransactionDefinition, DbError> {
        Ok(TransactionDefinition {
            id: parse_uuid("transaction_definition", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            description: self.description,
            source_entity_id: parse_uuid("source entity", &self.source_entity_id)?,
            target_entity_id: parse_uuid("target entity", &self.target_entity_id)?,
            workflow: self.workflow,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct InstanceRow {
    record_id: String,
    tenant_id: String,
    definition_id: String,
    status: String,
    payload: serde_json::Value,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<TransactionStatus, DbError> {
    match s {
        "pending" => Ok(TransactionStatus::Pending),
        "processing" => Ok(TransactionStatus::Processing),
        "completed" => Ok(TransactionStatus::Completed),
        "failed" => Ok(TransactionStatus::Failed),
        other => Err(DbError::Decode(format!("unknown transaction status: {other}"))),
    }
}

fn status_to_string(status: TransactionStatus) -> String {
    match status {
        TransactionStatus::Pending => "pending".into(),
        TransactionStatus::Processing => "processing".into(),
        TransactionStatus::Completed => "completed".into(),
        TransactionStatus::Failed => "failed".into(),
    }
}

impl InstanceRow {
    fn try_into_instance(self) -> Result<TransactionInstance, DbError> {
        Ok(TransactionInstance {
            id: parse_uuid("transaction_instance", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            definition_id: parse_uuid("transaction_definition", &self.definition_id)?,
            status: parse_status(&self.status)?,
            payload: self.payload,
            error_message: self.error_message,
            started_at: self.started_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

async fn require_entity<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    entity_id: Uuid,
) -> SwitchboardResult<()> {
    if entity_in_tenant(db, tenant_id, entity_id).await? {
        Ok(())
    } else {
        Err(SwitchboardError::validation(format!(
            "entity {entity_id} does not exist in this tenant"
        )))
    }
}

// -----------------------------------------------------------------------
// Definitions
// -----------------------------------------------------------------------

/// SurrealDB implementation of the TransactionDefinition repository.
#[derive(Clone)]
pub struct SurrealTransactionDefinitionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTransactionDefinitionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TransactionDefinitionRepository for SurrealTransactionDefinitionRepository<C> {
    async fn create(
        &self,
        input: CreateTransactionDefinition,
    ) -> SwitchboardResult<TransactionDefinition> {
        require_entity(&self.db, input.tenant_id, input.source_entity_id).await?;
        require_entity(&self.db, input.tenant_id, input.target_entity_id).await?;

        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('transaction_definition', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 description = $description, \
                 source_entity_id = $source_entity_id, \
                 target_entity_id = $target_entity_id, \
                 workflow = $workflow; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('transaction_definition', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("source_entity_id", input.source_entity_id.to_string()))
            .bind(("target_entity_id", input.target_entity_id.to_string()))
            .bind(("workflow", input.workflow.unwrap_or_else(empty_object)))
            .await
            .map_err(DbError::from)?
            .check_statements("transaction_definition")?;

        let rows: Vec<DefinitionRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "transaction_definition", id)?.try_into_definition()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<TransactionDefinition> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('transaction_definition', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DefinitionRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "transaction_definition", id)?.try_into_definition()?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateTransactionDefinition,
    ) -> SwitchboardResult<TransactionDefinition> {
        self.get_by_id(tenant_id, id).await?;
        if let Some(source) = input.source_entity_id {
            require_entity(&self.db, tenant_id, source).await?;
        }
        if let Some(target) = input.target_entity_id {
            require_entity(&self.db, tenant_id, target).await?;
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.source_entity_id.is_some() {
            sets.push("source_entity_id = $source_entity_id");
        }
        if input.target_entity_id.is_some() {
            sets.push("target_entity_id = $target_entity_id");
        }
        if input.workflow.is_some() {
            sets.push("workflow = $workflow");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('transaction_definition', $id) SET {} \
             WHERE tenant_id = $tenant_id; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('transaction_definition', $id) \
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
        if let Some(source) = input.source_entity_id {
            builder = builder.bind(("source_entity_id", source.to_string()));
        }
        if let Some(target) = input.target_entity_id {
            builder = builder.bind(("target_entity_id", target.to_string()));
        }
        if let Some(workflow) = input.workflow {
            builder = builder.bind(("workflow", workflow));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("transaction_definition")?;

        let rows: Vec<DefinitionRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "transaction_definition", id)?.try_into_definition()?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<()> {
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE transaction_instance \
                 WHERE tenant_id = $tenant_id AND definition_id = $id; \
                 DELETE type::record('transaction_definition', $id) \
                 WHERE tenant_id = $tenant_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("transaction_definition")?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<TransactionDefinition>> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM transaction_definition \
                 WHERE tenant_id = $tenant_id GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM transaction_definition \
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
        let rows: Vec<DefinitionRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(DefinitionRow::try_into_definition)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

// -----------------------------------------------------------------------
// Instances
// -----------------------------------------------------------------------

/// SurrealDB implementation of the TransactionInstance repository.
#[derive(Clone)]
pub struct SurrealTransactionInstanceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTransactionInstanceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TransactionInstanceRepository for SurrealTransactionInstanceRepository<C> {
    async fn create(&self, input: CreateTransactionInstance) -> SwitchboardResult<TransactionInstance> {
        let definition = SurrealTransactionDefinitionRepository::new(self.db.clone())
            .get_by_id(input.tenant_id, input.definition_id)
            .await
            .map_err(|e| match e {
                SwitchboardError::NotFound { .. } => SwitchboardError::validation(format!(
                    "transaction definition {} does not exist in this tenant",
                    input.definition_id
                )),
                other => other,
            })?;
        if !definition.is_active {
            return Err(SwitchboardError::validation(format!(
                "transaction definition '{}' is inactive",
                definition.name
            )));
        }

        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('transaction_instance', $id) SET \
                 tenant_id = $tenant_id, definition_id = $definition_id, \
                 status = 'pending', payload = $payload; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('transaction_instance', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("definition_id", input.definition_id.to_string()))
            .bind(("payload", input.payload.unwrap_or_else(empty_object)))
            .await
            .map_err(DbError::from)?
            .check_statements("transaction_instance")?;

        let rows: Vec<InstanceRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "transaction_instance", id)?.try_into_instance()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<TransactionInstance> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('transaction_instance', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstanceRow> = result.take(0).map_err(DbError::from)?;
        Ok(first(rows, "transaction_instance", id)?.try_into_instance()?)
    }

    async fn update_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateTransactionStatus,
    ) -> SwitchboardResult<TransactionInstance> {
        let current = self.get_by_id(tenant_id, id).await?;

        let mut sets = vec!["status = $status", "updated_at = time::now()"];
        match input.status {
            TransactionStatus::Pending => sets.push("completed_at = NONE"),
            TransactionStatus::Processing => {
                if current.started_at.is_none() {
                    sets.push("started_at = time::now()");
                }
                sets.push("completed_at = NONE");
            }
            TransactionStatus::Completed | TransactionStatus::Failed => {
                sets.push("completed_at = time::now()");
            }
        }
        match input.error_message {
            Some(_) => sets.push("error_message = $error_message"),
            None => sets.push("error_message = NONE"),
        }

        let query = format!(
            "UPDATE type::record('transaction_instance', $id) SET {} \
             WHERE tenant_id = $tenant_id; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('transaction_instance', $id) \
             WHERE tenant_id = $tenant_id;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", status_to_string(input.status)));
        if let Some(error_message) = input.error_message {
            builder = builder.bind(("error_message", error_message));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check_statements("transaction_instance")?;

        debug!(
            instance_id = %id,
            from = ?current.status,
            to = ?input.status,
            "Transaction status changed"
        );

        let rows: Vec<InstanceRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "transaction_instance", id)?.try_into_instance()?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> SwitchboardResult<()> {
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query(
                "DELETE type::record('transaction_instance', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check_statements("transaction_instance")?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        filter: TransactionInstanceFilter,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<TransactionInstance>> {
        let mut conditions = vec!["tenant_id = $tenant_id"];
        if filter.definition_id.is_some() {
            conditions.push("definition_id = $definition_id");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        let where_clause = conditions.join(" AND ");

        let query = format!(
            "SELECT count() AS total FROM transaction_instance \
             WHERE {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM transaction_instance \
             WHERE {where_clause} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(definition_id) = filter.definition_id {
            builder = builder.bind(("definition_id", definition_id.to_string()));
        }
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status_to_string(status)));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<InstanceRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(InstanceRow::try_into_instance)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
