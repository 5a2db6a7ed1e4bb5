//! Transaction definitions and their runtime instances.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use switchboard_core::models::permission::Permission;
use switchboard_core::models::transaction::{
    CreateTransactionDefinition, CreateTransactionInstance, TransactionDefinition,
    TransactionInstance, TransactionStatus, UpdateTransactionDefinition, UpdateTransactionStatus,
};
use switchboard_core::repository::{
    PaginatedResult, TransactionDefinitionRepository, TransactionInstanceFilter,
    TransactionInstanceRepository,
};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, PageQuery, TenantContext, page};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/tenants/:tenant_id/transaction-definitions",
            get(list_definitions).post(create_definition),
        )
        .route(
            "/tenants/:tenant_id/transaction-definitions/:definition_id",
            get(get_definition)
                .put(update_definition)
                .delete(delete_definition),
        )
        .route(
            "/tenants/:tenant_id/transaction-instances",
            get(list_instances).post(create_instance),
        )
        .route(
            "/tenants/:tenant_id/transaction-instances/:instance_id",
            get(get_instance).delete(delete_instance),
        )
        .route(
            "/tenants/:tenant_id/transaction-instances/:instance_id/status",
            put(update_status),
        )
}

#[derive(Debug, Deserialize)]
struct CreateDefinitionRequest {
    name: String,
    #[serde(default)]
    description: String,
    source_entity_id: Uuid,
    target_entity_id: Uuid,
    workflow: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CreateInstanceRequest {
    definition_id: Uuid,
    payload: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct InstanceQuery {
    definition_id: Option<Uuid>,
    status: Option<TransactionStatus>,
    offset: Option<u64>,
    limit: Option<u64>,
}

async fn list_definitions(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<PaginatedResult<TransactionDefinition>>> {
    ctx.require(&state, Permission::TransactionsView).await?;
    Ok(Json(
        state
            .transaction_definitions
            .list(ctx.tenant_id(), query.pagination())
            .await?,
    ))
}

async fn create_definition(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<CreateDefinitionRequest>,
) -> ApiResult<Json<TransactionDefinition>> {
    ctx.require(&state, Permission::TransactionsManage).await?;
    let input = CreateTransactionDefinition {
        tenant_id: ctx.tenant_id(),
        name: body.name,
        description: body.description,
        source_entity_id: body.source_entity_id,
        target_entity_id: body.target_entity_id,
        workflow: body.workflow,
    };
    input.validate()?;
    let definition = state.transaction_definitions.create(input).await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("transaction_definition.create {}", definition.name),
        )
        .await;
    Ok(Json(definition))
}

async fn get_definition(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, definition_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<TransactionDefinition>> {
    ctx.require(&state, Permission::TransactionsView).await?;
    Ok(Json(
        state
            .transaction_definitions
            .get_by_id(ctx.tenant_id(), definition_id)
            .await?,
    ))
}

async fn update_definition(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, definition_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateTransactionDefinition>,
) -> ApiResult<Json<TransactionDefinition>> {
    ctx.require(&state, Permission::TransactionsManage).await?;
    input.validate()?;
    let definition = state
        .transaction_definitions
        .update(ctx.tenant_id(), definition_id, input)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("transaction_definition.update {}", definition.name),
        )
        .await;
    Ok(Json(definition))
}

async fn delete_definition(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, definition_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::TransactionsManage).await?;
    state
        .transaction_definitions
        .delete(ctx.tenant_id(), definition_id)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("transaction_definition.delete {definition_id}"),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_instances(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<InstanceQuery>,
) -> ApiResult<Json<PaginatedResult<TransactionInstance>>> {
    ctx.require(&state, Permission::TransactionsView).await?;
    let filter = TransactionInstanceFilter {
        definition_id: query.definition_id,
        status: query.status,
    };
    Ok(Json(
        state
            .transaction_instances
            .list(ctx.tenant_id(), filter, page(query.offset, query.limit))
            .await?,
    ))
}

async fn create_instance(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<CreateInstanceRequest>,
) -> ApiResult<Json<TransactionInstance>> {
    ctx.require(&state, Permission::TransactionsManage).await?;
    let input = CreateTransactionInstance {
        tenant_id: ctx.tenant_id(),
        definition_id: body.definition_id,
        payload: body.payload,
    };
    let instance = state.transaction_instances.create(input).await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("transaction_instance.create {}", instance.id),
        )
        .await;
    Ok(Json(instance))
}

async fn get_instance(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, instance_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<TransactionInstance>> {
    ctx.require(&state, Permission::TransactionsView).await?;
    Ok(Json(
        state
            .transaction_instances
            .get_by_id(ctx.tenant_id(), instance_id)
            .await?,
    ))
}

async fn update_status(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, instance_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateTransactionStatus>,
) -> ApiResult<Json<TransactionInstance>> {
    ctx.require(&state, Permission::TransactionsManage).await?;
    let instance = state
        .transaction_instances
        .update_status(ctx.tenant_id(), instance_id, input)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!(
                "transaction_instance.status {instance_id} {:?}",
                instance.status
            ),
        )
        .await;
    Ok(Json(instance))
}

async fn delete_instance(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, instance_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::TransactionsManage).await?;
    state
        .transaction_instances
        .delete(ctx.tenant_id(), instance_id)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("transaction_instance.delete {instance_id}"),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
