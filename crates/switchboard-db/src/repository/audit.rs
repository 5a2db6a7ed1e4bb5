//! SurrealDB implementations of the append-only log and health-check
//! repositories.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use switchboard_core::error::SwitchboardResult;
use switchboard_core::models::audit::{
    CreateHealthCheck, CreateLogEntry, HealthCheck, HealthStatus, LogCategory, LogEntry,
};
use switchboard_core::repository::{
    AuditLogRepository, HealthCheckRepository, LogFilter, PaginatedResult, Pagination,
};
use uuid::Uuid;

use super::support::{CountRow, empty_object, first, parse_opt_uuid, parse_uuid, total};
use crate::error::{CheckStatements, DbError};

#[derive(Debug, SurrealValue)]
struct LogEntryRow {
    record_id: String,
    tenant_id: Option<String>,
    user_id: Option<String>,
    category: String,
    action: String,
    method: Option<String>,
    path: Option<String>,
    status: Option<i64>,
    duration_ms: Option<i64>,
    message: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

fn parse_category(s: &str) -> Result<LogCategory, DbError> {
    match s {
        "access" => Ok(LogCategory::Access),
        "error" => Ok(LogCategory::Error),
        "exception" => Ok(LogCategory::Exception),
        "activity" => Ok(LogCategory::Activity),
        other => Err(DbError::Decode(format!("unknown log category: {other}"))),
    }
}

fn category_to_string(category: LogCategory) -> String {
    match category {
        LogCategory::Access => "access".into(),
        LogCategory::Error => "error".into(),
        LogCategory::Exception => "exception".into(),
        LogCategory::Activity => "activity".into(),
    }
}

impl LogEntryRow {
    fn try_into_entry(self) -> Result<LogEntry, DbError> {
        let status = self
            .status
            .map(|s| {
                u16::try_from(s).map_err(|_| DbError::Decode(format!("invalid status code: {s}")))
            })
            .transpose()?;
        Ok(LogEntry {
            id: parse_uuid("log_entry", &self.record_id)?,
            tenant_id: parse_opt_uuid("tenant", self.tenant_id)?,
            user_id: parse_opt_uuid("user", self.user_id)?,
            category: parse_category(&self.category)?,
            action: self.action,
            method: self.method,
            path: self.path,
            status,
            duration_ms: self.duration_ms.map(|d| d.max(0) as u64),
            message: self.message,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the audit log.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateLogEntry) -> SwitchboardResult<LogEntry> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('log_entry', $id) SET \
                 tenant_id = $tenant_id, user_id = $user_id, \
                 category = $category, action = $action, \
                 method = $method, path = $path, status = $status, \
                 duration_ms = $duration_ms, message = $message, \
                 metadata = $metadata; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('log_entry', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("user_id", input.user_id.map(|u| u.to_string())))
            .bind(("category", category_to_string(input.category)))
            .bind(("action", input.action))
            .bind(("method", input.method))
            .bind(("path", input.path))
            .bind(("status", input.status.map(i64::from)))
            .bind(("duration_ms", input.duration_ms.map(|d| d as i64)))
            .bind(("message", input.message))
            .bind(("metadata", input.metadata.unwrap_or_else(empty_object)))
            .await
            .map_err(DbError::from)?
            .check_statements("log_entry")?;

        let rows: Vec<LogEntryRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "log_entry", id)?.try_into_entry()?)
    }

    async fn list(
        &self,
        filter: LogFilter,
        pagination: Pagination,
    ) -> SwitchboardResult<PaginatedResult<LogEntry>> {
        let mut conditions = Vec::new();
        if filter.tenant_id.is_some() {
            conditions.push("tenant_id = $tenant_id");
        }
        if filter.user_id.is_some() {
            conditions.push("user_id = $user_id");
        }
        if filter.category.is_some() {
            conditions.push("category = $category");
        }
        if filter.from.is_some() {
            conditions.push("timestamp >= $from");
        }
        if filter.to.is_some() {
            conditions.push("timestamp < $to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM log_entry {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM log_entry {where_clause} \
             ORDER BY timestamp DESC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));

        if let Some(tenant_id) = filter.tenant_id {
            builder = builder.bind(("tenant_id", tenant_id.to_string()));
        }
        if let Some(user_id) = filter.user_id {
            builder = builder.bind(("user_id", user_id.to_string()));
        }
        if let Some(category) = filter.category {
            builder = builder.bind(("category", category_to_string(category)));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<LogEntryRow> = result.take(1).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(LogEntryRow::try_into_entry)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: total(count_rows),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct HealthCheckRow {
    record_id: String,
    component: String,
    status: String,
    latency_ms: i64,
    detail: Option<String>,
    checked_at: DateTime<Utc>,
}

fn parse_health_status(s: &str) -> Result<HealthStatus, DbError> {
    match s {
        "healthy" => Ok(HealthStatus::Healthy),
        "degraded" => Ok(HealthStatus::Degraded),
        "unhealthy" => Ok(HealthStatus::Unhealthy),
        other => Err(DbError::Decode(format!("unknown health status: {other}"))),
    }
}

fn health_status_to_string(status: HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "healthy".into(),
        HealthStatus::Degraded => "degraded".into(),
        HealthStatus::Unhealthy => "unhealthy".into(),
    }
}

impl HealthCheckRow {
    fn try_into_check(self) -> Result<HealthCheck, DbError> {
        Ok(HealthCheck {
            id: parse_uuid("health_check", &self.record_id)?,
            component: self.component,
            status: parse_health_status(&self.status)?,
            latency_ms: self.latency_ms.max(0) as u64,
            detail: self.detail,
            checked_at: self.checked_at,
        })
    }
}

/// SurrealDB implementation of the health-check history.
#[derive(Clone)]
pub struct SurrealHealthCheckRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHealthCheckRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> HealthCheckRepository for SurrealHealthCheckRepository<C> {
    async fn record(&self, input: CreateHealthCheck) -> SwitchboardResult<HealthCheck> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('health_check', $id) SET \
                 component = $component, status = $status, \
                 latency_ms = $latency_ms, detail = $detail; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('health_check', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("component", input.component))
            .bind(("status", health_status_to_string(input.status)))
            .bind(("latency_ms", input.latency_ms as i64))
            .bind(("detail", input.detail))
            .await
            .map_err(DbError::from)?
            .check_statements("health_check")?;

        let rows: Vec<HealthCheckRow> = result.take(1).map_err(DbError::from)?;
        Ok(first(rows, "health_check", id)?.try_into_check()?)
    }

    async fn list_recent(&self, limit: u64) -> SwitchboardResult<Vec<HealthCheck>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM health_check \
                 ORDER BY checked_at DESC LIMIT $limit",
            )
            .bind(("limit", limit))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HealthCheckRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(HealthCheckRow::try_into_check)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_strings_match_schema() {
        for category in [
            LogCategory::Access,
            LogCategory::Error,
            LogCategory::Exception,
            LogCategory::Activity,
        ] {
            let s = category_to_string(category);
            assert_eq!(parse_category(&s).unwrap(), category);
        }
        assert!(parse_category("debug").is_err());
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        let row = LogEntryRow {
            record_id: Uuid::new_v4().to_string(),
            tenant_id: None,
            user_id: None,
            category: "access".into(),
            action: "GET /health".into(),
            method: Some("GET".into()),
            path: Some("/health".into()),
            status: Some(200),
            duration_ms: Some(-3),
            message: "ok".into(),
            metadata: serde_json::json!({}),
            timestamp: Utc::now(),
        };
        let entry = row.try_into_entry().unwrap();
        assert_eq!(entry.status, Some(200));
        assert_eq!(entry.duration_ms, Some(0));
    }
}
