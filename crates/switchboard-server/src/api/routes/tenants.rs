//! Tenant lifecycle and the caller's permissions within a tenant.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use switchboard_core::models::permission::{Permission, PermissionSet};
use switchboard_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use switchboard_core::repository::{PaginatedResult, TenantRepository};
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{
    ApiJson, ApiQuery, AuthenticatedUser, PageQuery, TenantContext, page_of,
};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route(
            "/tenants/:tenant_id",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
        .route("/tenants/:tenant_id/permissions/me", get(my_permissions))
}

/// Platform admins see every tenant, everyone else the tenants they
/// hold a role in.
async fn list_tenants(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Tenant>>> {
    let pagination = query.pagination();
    if user.is_platform_admin {
        return Ok(Json(state.tenants.list(pagination).await?));
    }
    let tenants = state.tenants.list_for_user(user.id).await?;
    Ok(Json(page_of(tenants, pagination)))
}

async fn create_tenant(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(input): ApiJson<CreateTenant>,
) -> ApiResult<Json<Tenant>> {
    state.authz.require_platform_admin(&user)?;
    input.validate()?;
    let tenant = state.tenants.create(input, user.id).await?;
    info!(tenant_id = %tenant.id, slug = %tenant.slug, "Tenant created");
    state
        .record_activity(tenant.id, user.id, format!("tenant.create {}", tenant.slug))
        .await;
    Ok(Json(tenant))
}

async fn get_tenant(ctx: TenantContext) -> Json<Tenant> {
    Json(ctx.tenant)
}

async fn update_tenant(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiJson(input): ApiJson<UpdateTenant>,
) -> ApiResult<Json<Tenant>> {
    ctx.require(&state, Permission::TenantManage).await?;
    input.validate()?;
    let tenant = state.tenants.update(ctx.tenant_id(), input).await?;
    state
        .record_activity(tenant.id, ctx.user.id, "tenant.update")
        .await;
    Ok(Json(tenant))
}

async fn delete_tenant(
    State(state): State<SharedState>,
    ctx: TenantContext,
) -> ApiResult<StatusCode> {
    state.authz.require_platform_admin(&ctx.user)?;
    state.tenants.delete(ctx.tenant_id()).await?;
    info!(tenant_id = %ctx.tenant.id, slug = %ctx.tenant.slug, "Tenant deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub(crate) struct PermissionsResponse {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub permissions: PermissionSet,
}

async fn my_permissions(
    State(state): State<SharedState>,
    ctx: TenantContext,
) -> ApiResult<Json<PermissionsResponse>> {
    let permissions = state
        .authz
        .permissions_for(&ctx.user, ctx.tenant_id())
        .await?;
    Ok(Json(PermissionsResponse {
        tenant_id: ctx.tenant.id,
        user_id: ctx.user.id,
        permissions,
    }))
}
