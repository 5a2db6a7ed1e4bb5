//! HTTP error mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use switchboard_authz::AuthzError;
use switchboard_core::error::SwitchboardError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] SwitchboardError),

    #[error("{0}")]
    BadRequest(String),
}

/// Response extension carrying the real message behind a 500, picked up
/// by the access-log middleware.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(e) => match e {
                SwitchboardError::NotFound { .. } => StatusCode::NOT_FOUND,
                SwitchboardError::AlreadyExists { .. } | SwitchboardError::Conflict { .. } => {
                    StatusCode::CONFLICT
                }
                SwitchboardError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
                SwitchboardError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
                SwitchboardError::Validation { .. } | SwitchboardError::TenantContext => {
                    StatusCode::BAD_REQUEST
                }
                SwitchboardError::Database(_) | SwitchboardError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let detail = self.to_string();
            error!(error = %detail, "Request failed");
            let body = Json(json!({
                "status": status.as_u16(),
                "message": "internal server error",
            }));
            let mut response = (status, body).into_response();
            response.extensions_mut().insert(InternalErrorDetail(detail));
            return response;
        }

        let body = Json(json!({
            "status": status.as_u16(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use switchboard_core::models::permission::Permission;

    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (SwitchboardError::not_found("role", "x"), StatusCode::NOT_FOUND),
            (
                SwitchboardError::AlreadyExists {
                    entity: "tenant".into(),
                },
                StatusCode::CONFLICT,
            ),
            (SwitchboardError::conflict("in use"), StatusCode::CONFLICT),
            (SwitchboardError::validation("bad"), StatusCode::BAD_REQUEST),
            (SwitchboardError::TenantContext, StatusCode::BAD_REQUEST),
            (SwitchboardError::denied("no"), StatusCode::FORBIDDEN),
            (
                SwitchboardError::Database("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn authz_errors_map_through_the_domain() {
        assert_eq!(
            ApiError::from(AuthzError::MissingToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthzError::PermissionDenied(Permission::AuditView)).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn server_errors_hide_their_detail() {
        let response =
            ApiError::from(SwitchboardError::Internal("secret detail".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalErrorDetail>().unwrap();
        assert!(detail.0.contains("secret detail"));
    }
}
