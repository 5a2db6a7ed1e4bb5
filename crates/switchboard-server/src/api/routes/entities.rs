//! Business-object schema tree.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use switchboard_core::models::entity::{CreateEntity, Entity, UpdateEntity};
use switchboard_core::models::permission::Permission;
use switchboard_core::repository::{EntityRepository, PaginatedResult};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, PageQuery, TenantContext};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/tenants/:tenant_id/entities",
            get(list_entities).post(create_entity),
        )
        .route(
            "/tenants/:tenant_id/entities/:entity_id",
            get(get_entity).put(update_entity).delete(delete_entity),
        )
        .route(
            "/tenants/:tenant_id/entities/:entity_id/children",
            get(children),
        )
        .route(
            "/tenants/:tenant_id/entities/:entity_id/ancestors",
            get(ancestors),
        )
        .route(
            "/tenants/:tenant_id/entities/:entity_id/usage",
            post(record_usage),
        )
}

#[derive(Debug, Deserialize)]
struct CreateEntityRequest {
    name: String,
    #[serde(default)]
    description: String,
    parent_entity_id: Option<Uuid>,
    schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct UsageRequest {
    delta: i64,
}

async fn list_entities(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Entity>>> {
    ctx.require(&state, Permission::EntitiesView).await?;
    Ok(Json(
        state
            .entities
            .list(ctx.tenant_id(), query.pagination())
            .await?,
    ))
}

async fn create_entity(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<CreateEntityRequest>,
) -> ApiResult<Json<Entity>> {
    ctx.require(&state, Permission::EntitiesManage).await?;
    let input = CreateEntity {
        tenant_id: ctx.tenant_id(),
        name: body.name,
        description: body.description,
        parent_entity_id: body.parent_entity_id,
        schema: body.schema,
    };
    input.validate()?;
    let entity = state.entities.create(input).await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("entity.create {}", entity.name),
        )
        .await;
    Ok(Json(entity))
}

async fn get_entity(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, entity_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Entity>> {
    ctx.require(&state, Permission::EntitiesView).await?;
    Ok(Json(
        state.entities.get_by_id(ctx.tenant_id(), entity_id).await?,
    ))
}

async fn update_entity(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, entity_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateEntity>,
) -> ApiResult<Json<Entity>> {
    ctx.require(&state, Permission::EntitiesManage).await?;
    input.validate()?;
    let entity = state
        .entities
        .update(ctx.tenant_id(), entity_id, input)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("entity.update {}", entity.name),
        )
        .await;
    Ok(Json(entity))
}

async fn delete_entity(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, entity_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::EntitiesManage).await?;
    state.entities.delete(ctx.tenant_id(), entity_id).await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("entity.delete {entity_id}"),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn children(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, entity_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<Entity>>> {
    ctx.require(&state, Permission::EntitiesView).await?;
    Ok(Json(
        state
            .entities
            .get_children(ctx.tenant_id(), entity_id)
            .await?,
    ))
}

async fn ancestors(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, entity_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<Entity>>> {
    ctx.require(&state, Permission::EntitiesView).await?;
    Ok(Json(
        state
            .entities
            .get_ancestors(ctx.tenant_id(), entity_id)
            .await?,
    ))
}

async fn record_usage(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, entity_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(body): ApiJson<UsageRequest>,
) -> ApiResult<Json<Entity>> {
    ctx.require(&state, Permission::EntitiesManage).await?;
    Ok(Json(
        state
            .entities
            .record_usage(ctx.tenant_id(), entity_id, body.delta)
            .await?,
    ))
}
