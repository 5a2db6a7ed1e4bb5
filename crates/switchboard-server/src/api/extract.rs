//! Request extractors: JSON/path/query wrappers with API-shaped
//! rejections, the authenticated caller and the per-request tenant
//! context.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use axum::extract::{FromRequest, FromRequestParts, Path};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::{RequestPartsExt, async_trait};
use serde::Deserialize;
use switchboard_authz::AuthzError;
use switchboard_core::error::SwitchboardError;
use switchboard_core::models::permission::Permission;
use switchboard_core::models::tenant::Tenant;
use switchboard_core::models::user::User;
use switchboard_core::repository::{PaginatedResult, Pagination};
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::state::SharedState;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthzError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthzError::MissingToken)
}

/// Who is acting on the current request, filled in by the extractors
/// and read back by the access log once the response is ready.
#[derive(Debug, Clone, Default)]
pub struct RequestActor {
    user_id: Arc<OnceLock<Uuid>>,
    tenant_id: Arc<OnceLock<Uuid>>,
}

impl RequestActor {
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id.get().copied()
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id.get().copied()
    }

    fn set_user(&self, id: Uuid) {
        let _ = self.user_id.set(id);
    }

    fn set_tenant(&self, id: Uuid) {
        let _ = self.tenant_id.set(id);
    }
}

/// An active, signed-in user.
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<SharedState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user = state.authz.authenticate(token).await?;
        if let Some(actor) = parts.extensions.get::<RequestActor>() {
            actor.set_user(user.id);
        }
        Ok(Self(user))
    }
}

/// The tenant named by the `:tenant_id` path segment, checked for
/// membership of the caller.
pub struct TenantContext {
    pub tenant: Tenant,
    pub user: User,
}

impl TenantContext {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant.id
    }

    pub async fn require(&self, state: &SharedState, permission: Permission) -> ApiResult<()> {
        state
            .authz
            .require(&self.user, self.tenant.id, permission)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<SharedState> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        let Path(params) = parts
            .extract::<Path<HashMap<String, String>>>()
            .await
            .map_err(|_| SwitchboardError::TenantContext)?;
        let tenant_id = params
            .get("tenant_id")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or(SwitchboardError::TenantContext)?;

        let tenant = state.authz.tenant_for(&user, tenant_id).await?;
        if let Some(actor) = parts.extensions.get::<RequestActor>() {
            actor.set_tenant(tenant.id);
        }
        Ok(Self { tenant, user })
    }
}

/// `?offset=&limit=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        page(self.offset, self.limit)
    }
}

pub fn page(offset: Option<u64>, limit: Option<u64>) -> Pagination {
    let defaults = Pagination::default();
    Pagination {
        offset: offset.unwrap_or(defaults.offset),
        limit: limit.unwrap_or(defaults.limit),
    }
    .clamped()
}

/// Page over an already loaded list.
pub fn page_of<T>(items: Vec<T>, pagination: Pagination) -> PaginatedResult<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(pagination.offset as usize)
        .take(pagination.limit as usize)
        .collect();
    PaginatedResult {
        items,
        total,
        offset: pagination.offset,
        limit: pagination.limit,
    }
}
