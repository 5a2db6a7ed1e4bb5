//! Liveness and health-check history.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use switchboard_core::models::audit::{CreateHealthCheck, HealthCheck, HealthStatus};
use switchboard_core::repository::{HealthCheckRepository, MAX_PAGE_SIZE};
use tracing::warn;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiQuery, AuthenticatedUser};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/checks", get(list_checks))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: HealthStatus,
    database: HealthStatus,
    latency_ms: u64,
}

async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let started = Instant::now();
    let outcome = state.db.ping().await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (status, detail) = match outcome {
        Ok(()) => (HealthStatus::Healthy, None),
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            (HealthStatus::Unhealthy, Some(e.to_string()))
        }
    };

    let check = CreateHealthCheck {
        component: "database".into(),
        status,
        latency_ms,
        detail,
    };
    if let Err(e) = state.health_checks.record(check).await {
        warn!(error = %e, "Failed to record health check");
    }

    let code = if status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(HealthResponse {
            status,
            database: status,
            latency_ms,
        }),
    )
}

#[derive(Debug, Deserialize)]
struct ChecksQuery {
    limit: Option<u64>,
}

async fn list_checks(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<ChecksQuery>,
) -> ApiResult<Json<Vec<HealthCheck>>> {
    state.authz.require_platform_admin(&user)?;
    let limit = query.limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);
    Ok(Json(state.health_checks.list_recent(limit).await?))
}
