//! Sign-in and the caller's own profile.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use switchboard_core::models::tenant::Tenant;
use switchboard_core::models::user::{UpdateUser, User};
use switchboard_core::repository::{TenantRepository, UserRepository};

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, AuthenticatedUser, bearer_token};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me).patch(update_me))
}

/// Create or refresh the caller's user record from the token claims.
async fn login(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult<Json<User>> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.authz.sign_in(token).await?))
}

#[derive(Debug, Serialize)]
struct MeResponse {
    user: User,
    tenants: Vec<Tenant>,
}

async fn me(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<Json<MeResponse>> {
    // Tenants where the user holds a role; platform admins list the rest
    // through `GET /api/tenants`.
    let tenants = state.tenants.list_for_user(user.id).await?;
    Ok(Json(MeResponse { user, tenants }))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateProfileRequest {
    display_name: Option<String>,
    role_label: Option<String>,
}

async fn update_me(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let input = UpdateUser {
        email: None,
        display_name: body.display_name,
        role_label: body.role_label,
    };
    input.validate()?;
    Ok(Json(state.users.update(user.id, input).await?))
}
