//! Tenant audit log queries.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use switchboard_core::error::SwitchboardError;
use switchboard_core::models::audit::{LogCategory, LogEntry};
use switchboard_core::models::permission::Permission;
use switchboard_core::repository::{AuditLogRepository, LogFilter, PaginatedResult};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiQuery, TenantContext, page};
use crate::api::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new().route("/tenants/:tenant_id/audit-logs", get(list_logs))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    category: Option<LogCategory>,
    user_id: Option<Uuid>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    offset: Option<u64>,
    limit: Option<u64>,
}

async fn list_logs(
    State(state): State<SharedState>,
    ctx: TenantContext,
    ApiQuery(query): ApiQuery<LogQuery>,
) -> ApiResult<Json<PaginatedResult<LogEntry>>> {
    ctx.require(&state, Permission::AuditView).await?;
    if let (Some(from), Some(to)) = (query.from, query.to)
        && from > to
    {
        return Err(SwitchboardError::validation("from must not be after to").into());
    }
    let filter = LogFilter {
        tenant_id: Some(ctx.tenant_id()),
        user_id: query.user_id,
        category: query.category,
        from: query.from,
        to: query.to,
    };
    Ok(Json(
        state
            .audit_log
            .list(filter, page(query.offset, query.limit))
            .await?,
    ))
}
