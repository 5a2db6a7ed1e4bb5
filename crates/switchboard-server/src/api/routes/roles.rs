//! Tenant roles.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use switchboard_core::models::permission::{Permission, PermissionSet};
use switchboard_core::models::role::{CreateRole, Role, UpdateRole};
use switchboard_core::repository::{PaginatedResult, RoleRepository};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, PageQuery, TenantContext};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/tenants/:tenant_id/roles", get(list_roles).post(create_role))
        .route(
            "/tenants/:tenant_id/roles/:role_id",
            get(get_role).put(update_role).delete(delete_role),
        )
}

#[derive(Debug, Deserialize)]
struct CreateRoleRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    permissions: PermissionSet,
}

async fn list_roles(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Role>>> {
    ctx.require(&state, Permission::RolesView).await?;
    Ok(Json(
        state.roles.list(ctx.tenant_id(), query.pagination()).await?,
    ))
}

async fn create_role(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<CreateRoleRequest>,
) -> ApiResult<Json<Role>> {
    ctx.require(&state, Permission::RolesManage).await?;
    let input = CreateRole {
        tenant_id: ctx.tenant_id(),
        name: body.name,
        description: body.description,
        permissions: body.permissions,
        is_system: false,
    };
    input.validate()?;
    let role = state.roles.create(input).await?;
    state
        .record_activity(ctx.tenant.id, ctx.user.id, format!("role.create {}", role.name))
        .await;
    Ok(Json(role))
}

async fn get_role(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, role_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Role>> {
    ctx.require(&state, Permission::RolesView).await?;
    Ok(Json(state.roles.get_by_id(ctx.tenant_id(), role_id).await?))
}

async fn update_role(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, role_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateRole>,
) -> ApiResult<Json<Role>> {
    ctx.require(&state, Permission::RolesManage).await?;
    input.validate()?;
    let role = state.roles.update(ctx.tenant_id(), role_id, input).await?;
    state
        .record_activity(ctx.tenant.id, ctx.user.id, format!("role.update {}", role.name))
        .await;
    Ok(Json(role))
}

async fn delete_role(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, role_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::RolesManage).await?;
    state.roles.delete(ctx.tenant_id(), role_id).await?;
    state
        .record_activity(ctx.tenant.id, ctx.user.id, format!("role.delete {role_id}"))
        .await;
    Ok(StatusCode::NO_CONTENT)
}
