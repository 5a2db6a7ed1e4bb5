//! Role assignments and effective permissions of tenant users.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use switchboard_core::models::assignment::UserTenantRole;
use switchboard_core::models::permission::Permission;
use switchboard_core::models::role::Role;
use switchboard_core::repository::{PaginatedResult, RoleRepository};
use uuid::Uuid;

use super::tenants::PermissionsResponse;
use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, PageQuery, TenantContext};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/tenants/:tenant_id/users/:user_id/roles",
            get(list_user_roles).post(assign_role),
        )
        .route(
            "/tenants/:tenant_id/users/:user_id/roles/:role_id",
            delete(unassign_role),
        )
        .route(
            "/tenants/:tenant_id/users/:user_id/permissions",
            get(user_permissions),
        )
        .route("/tenants/:tenant_id/assignments", get(list_assignments))
}

#[derive(Debug, Deserialize)]
struct AssignRoleRequest {
    role_id: Uuid,
}

async fn list_user_roles(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<Role>>> {
    ctx.require(&state, Permission::UsersView).await?;
    Ok(Json(
        state.roles.get_user_roles(ctx.tenant_id(), user_id).await?,
    ))
}

async fn assign_role(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, user_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(body): ApiJson<AssignRoleRequest>,
) -> ApiResult<Json<UserTenantRole>> {
    ctx.require(&state, Permission::UsersManage).await?;
    let assignment = state
        .roles
        .assign_to_user(ctx.tenant_id(), user_id, body.role_id)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("role.assign {} -> {user_id}", body.role_id),
        )
        .await;
    Ok(Json(assignment))
}

async fn unassign_role(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, user_id, role_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::UsersManage).await?;
    state
        .roles
        .unassign_from_user(ctx.tenant_id(), user_id, role_id)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("role.unassign {role_id} -> {user_id}"),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn user_permissions(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<PermissionsResponse>> {
    ctx.require(&state, Permission::UsersView).await?;
    let permissions = state
        .authz
        .effective_permissions(user_id, ctx.tenant_id())
        .await?;
    Ok(Json(PermissionsResponse {
        tenant_id: ctx.tenant.id,
        user_id,
        permissions,
    }))
}

async fn list_assignments(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<PaginatedResult<UserTenantRole>>> {
    ctx.require(&state, Permission::UsersView).await?;
    Ok(Json(
        state
            .roles
            .list_assignments(ctx.tenant_id(), query.pagination())
            .await?,
    ))
}
