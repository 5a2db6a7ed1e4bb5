//! Global reference data: countries, currencies, languages and cities.
//!
//! The four kinds share one set of handlers; the kind is injected as a
//! request extension by each nested router.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use switchboard_core::models::reference::{
    CreateReferenceItem, ReferenceItem, ReferenceKind, UpdateReferenceItem,
};
use switchboard_core::repository::{PaginatedResult, ReferenceRepository};
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, AuthenticatedUser, page};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .nest("/countries", kind_routes(ReferenceKind::Country))
        .nest("/currencies", kind_routes(ReferenceKind::Currency))
        .nest("/languages", kind_routes(ReferenceKind::Language))
        .nest("/cities", kind_routes(ReferenceKind::City))
}

fn kind_routes(kind: ReferenceKind) -> Router<SharedState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/by-code/:code", get(get_by_code))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .layer(Extension(kind))
}

#[derive(Debug, Deserialize)]
struct ReferenceQuery {
    /// Cities only: restrict to one country code.
    country: Option<String>,
    offset: Option<u64>,
    limit: Option<u64>,
}

async fn list_items(
    State(state): State<SharedState>,
    Extension(kind): Extension<ReferenceKind>,
    AuthenticatedUser(_): AuthenticatedUser,
    ApiQuery(query): ApiQuery<ReferenceQuery>,
) -> ApiResult<Json<PaginatedResult<ReferenceItem>>> {
    let parent_code = query.country.filter(|_| kind == ReferenceKind::City);
    Ok(Json(
        state
            .reference
            .list(kind, parent_code, page(query.offset, query.limit))
            .await?,
    ))
}

async fn create_item(
    State(state): State<SharedState>,
    Extension(kind): Extension<ReferenceKind>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(input): ApiJson<CreateReferenceItem>,
) -> ApiResult<Json<ReferenceItem>> {
    state.authz.require_platform_admin(&user)?;
    input.validate(kind)?;
    let item = state.reference.create(kind, input).await?;
    info!(kind = kind.as_str(), code = %item.code, "Reference item created");
    Ok(Json(item))
}

async fn get_item(
    State(state): State<SharedState>,
    Extension(kind): Extension<ReferenceKind>,
    AuthenticatedUser(_): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ReferenceItem>> {
    Ok(Json(state.reference.get_by_id(kind, id).await?))
}

async fn get_by_code(
    State(state): State<SharedState>,
    Extension(kind): Extension<ReferenceKind>,
    AuthenticatedUser(_): AuthenticatedUser,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<Json<ReferenceItem>> {
    Ok(Json(state.reference.get_by_code(kind, &code).await?))
}

async fn update_item(
    State(state): State<SharedState>,
    Extension(kind): Extension<ReferenceKind>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateReferenceItem>,
) -> ApiResult<Json<ReferenceItem>> {
    state.authz.require_platform_admin(&user)?;
    Ok(Json(state.reference.update(kind, id, input).await?))
}

async fn delete_item(
    State(state): State<SharedState>,
    Extension(kind): Extension<ReferenceKind>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.authz.require_platform_admin(&user)?;
    state.reference.delete(kind, id).await?;
    info!(kind = kind.as_str(), %id, "Reference item deleted");
    Ok(StatusCode::NO_CONTENT)
}
