//! Access-log middleware: every request is appended to the `access`
//! log; server errors and panics also get an `error`/`exception` entry.

use std::any::Any;
use std::time::Instant;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use switchboard_core::models::audit::{CreateLogEntry, LogCategory};
use switchboard_core::repository::AuditLogRepository;
use tracing::{debug, error, warn};

use super::error::InternalErrorDetail;
use super::extract::RequestActor;
use super::state::SharedState;

/// Response extension set by [`panic_response`].
#[derive(Debug, Clone)]
pub struct PanicDetail(pub String);

pub async fn record(State(state): State<SharedState>, mut request: Request, next: Next) -> Response {
    let actor = RequestActor::default();
    request.extensions_mut().insert(actor.clone());

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let status = response.status().as_u16();
    debug!(%method, %path, status, duration_ms, "Request completed");

    let entry = |category: LogCategory, message: String| CreateLogEntry {
        tenant_id: actor.tenant_id(),
        user_id: actor.user_id(),
        category,
        action: format!("{method} {path}"),
        method: Some(method.clone()),
        path: Some(path.clone()),
        status: Some(status),
        duration_ms: Some(duration_ms),
        message,
        metadata: None,
    };

    let mut entries = vec![entry(LogCategory::Access, format!("{method} {path} -> {status}"))];
    if let Some(InternalErrorDetail(detail)) = response.extensions().get::<InternalErrorDetail>() {
        entries.push(entry(LogCategory::Error, detail.clone()));
    }
    if let Some(PanicDetail(detail)) = response.extensions().get::<PanicDetail>() {
        entries.push(entry(LogCategory::Exception, detail.clone()));
    }

    for entry in entries {
        if let Err(e) = state.audit_log.append(entry).await {
            warn!(error = %e, %path, "Failed to append log entry");
        }
    }

    response
}

/// Turn a handler panic into a generic 500 and keep its message for the
/// exception log.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Handler panicked");

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let mut response = (
        status,
        Json(json!({
            "status": status.as_u16(),
            "message": "internal server error",
        })),
    )
        .into_response();
    response.extensions_mut().insert(PanicDetail(detail));
    response
}
