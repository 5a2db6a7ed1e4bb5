//! Per-user permission overrides.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use switchboard_core::models::permission::Permission;
use switchboard_core::models::role_exception::{
    CreateRoleException, ExceptionEffect, RoleException, UpdateRoleException,
};
use switchboard_core::repository::{PaginatedResult, RoleExceptionRepository, UserRepository};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, TenantContext, page, page_of};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/tenants/:tenant_id/role-exceptions",
            get(list_exceptions).post(create_exception),
        )
        .route(
            "/tenants/:tenant_id/role-exceptions/:exception_id",
            get(get_exception)
                .put(update_exception)
                .delete(delete_exception),
        )
}

#[derive(Debug, Deserialize)]
struct ExceptionQuery {
    user_id: Option<Uuid>,
    offset: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CreateExceptionRequest {
    user_id: Uuid,
    permission: Permission,
    effect: ExceptionEffect,
    #[serde(default)]
    reason: String,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
}

async fn list_exceptions(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<ExceptionQuery>,
) -> ApiResult<Json<PaginatedResult<RoleException>>> {
    ctx.require(&state, Permission::UsersView).await?;
    let pagination = page(query.offset, query.limit);
    let result = match query.user_id {
        Some(user_id) => page_of(
            state
                .role_exceptions
                .list_for_user(ctx.tenant_id(), user_id)
                .await?,
            pagination,
        ),
        None => {
            state
                .role_exceptions
                .list(ctx.tenant_id(), pagination)
                .await?
        }
    };
    Ok(Json(result))
}

async fn create_exception(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiJson(body): ApiJson<CreateExceptionRequest>,
) -> ApiResult<Json<RoleException>> {
    ctx.require(&state, Permission::UsersManage).await?;
    state.users.get_by_id(body.user_id).await?;
    let input = CreateRoleException {
        tenant_id: ctx.tenant_id(),
        user_id: body.user_id,
        permission: body.permission,
        effect: body.effect,
        reason: body.reason,
        valid_from: body.valid_from,
        valid_to: body.valid_to,
    };
    input.validate()?;
    let exception = state.role_exceptions.create(input).await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!(
                "role_exception.create {} {:?} -> {}",
                exception.permission, exception.effect, exception.user_id
            ),
        )
        .await;
    Ok(Json(exception))
}

async fn get_exception(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, exception_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<RoleException>> {
    ctx.require(&state, Permission::UsersView).await?;
    Ok(Json(
        state
            .role_exceptions
            .get_by_id(ctx.tenant_id(), exception_id)
            .await?,
    ))
}

async fn update_exception(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, exception_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateRoleException>,
) -> ApiResult<Json<RoleException>> {
    ctx.require(&state, Permission::UsersManage).await?;
    let exception = state
        .role_exceptions
        .update(ctx.tenant_id(), exception_id, input)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("role_exception.update {exception_id}"),
        )
        .await;
    Ok(Json(exception))
}

async fn delete_exception(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiPath((_, exception_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(&state, Permission::UsersManage).await?;
    state
        .role_exceptions
        .delete(ctx.tenant_id(), exception_id)
        .await?;
    state
        .record_activity(
            ctx.tenant.id,
            ctx.user.id,
            format!("role_exception.delete {exception_id}"),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
