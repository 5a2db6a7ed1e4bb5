//! Platform-wide user administration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use switchboard_core::models::user::User;
use switchboard_core::repository::{PaginatedResult, UserRepository};
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiPath, ApiQuery, AuthenticatedUser, PageQuery};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id/deactivate", post(deactivate_user))
}

async fn list_users(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<PaginatedResult<User>>> {
    state.authz.require_platform_admin(&user)?;
    Ok(Json(state.users.list(query.pagination()).await?))
}

async fn get_user(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<User>> {
    state.authz.require_platform_admin(&user)?;
    Ok(Json(state.users.get_by_id(user_id).await?))
}

async fn deactivate_user(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.authz.require_platform_admin(&user)?;
    state.users.deactivate(user_id).await?;
    info!(%user_id, by = %user.id, "User deactivated");
    Ok(StatusCode::NO_CONTENT)
}
