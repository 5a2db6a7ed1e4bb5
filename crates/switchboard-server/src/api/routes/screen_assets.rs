//! Screens, forms, reports and dashboards bound to entities.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use switchboard_core::models::permission::Permission;
use switchboard_core::models::screen_asset::{
    AssetType, CreateScreenAsset, ScreenAsset, UpdateScreenAsset,
};
use switchboard_core::repository::{PaginatedResult, ScreenAssetRepository};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, PageQuery, TenantContext};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/tenants/:tenant_id/screen-assets",
            get(list_assets).post(create_asset),
        )
        .route(
            "/tenants/:tenant_id/screen-assets/:asset_id",
            get(get_asset).put(update_asset).delete(delete_asset),
        )
}

#[derive(Debug, Deserialize)]
struct CreateAssetRequest {
    name: String,
    asset_type: AssetType,
    entity_id: Option<Uuid>,
    configuration: Option<serde_json::Value>,
}

async fn list_assets(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<PaginatedResult<ScreenAsset>>> {
    ctx.require(&state, Permission::ScreenAssetsView).await?;
    Ok(Json(
        state
            .screen_assets
            .list(ctx.tenant_id(), query.pagination())
            .await?,
    ))
}

async fn create_asset(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<CreateAssetRequest>,
) -> ApiResult<Json<ScreenAsset>> {
    ctx.require(&state, Permission::ScreenAssetsManage).await?;
    let input = CreateScreenAsset {
        tenant_id: ctx.tenant_id(),
        name: body.name,
        asset_type: body.asset_type,
        entity_id: body.entity_id,
        configuration: body.configuration,
    };
    input.validate()?;
    let asset = state.screen_assets.create(input).await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("screen_asset.create {}", asset.name),
        )
        .await;
    Ok(Json(asset))
}

async fn get_asset(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, asset_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<ScreenAsset>> {
    ctx.require(&state, Permission::ScreenAssetsView).await?;
    Ok(Json(
        state
            .screen_assets
            .get_by_id(ctx.tenant_id(), asset_id)
            .await?,
    ))
}

async fn update_asset(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, asset_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateScreenAsset>,
) -> ApiResult<Json<ScreenAsset>> {
    ctx.require(&state, Permission::ScreenAssetsManage).await?;
    input.validate()?;
    let asset = state
        .screen_assets
        .update(ctx.tenant_id(), asset_id, input)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("screen_asset.update {}", asset.name),
        )
        .await;
    Ok(Json(asset))
}

async fn delete_asset(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, asset_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::ScreenAssetsManage).await?;
    state
        .screen_assets
        .delete(ctx.tenant_id(), asset_id)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("screen_asset.delete {asset_id}"),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
