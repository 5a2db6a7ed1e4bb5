//! Row helpers shared by the repository implementations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

/// Total of a `SELECT count() AS total … GROUP ALL` statement. An empty
/// table yields no row at all.
pub(crate) fn total(rows: Vec<CountRow>) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(field: &str, value: Option<String>) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(field, &v)).transpose()
}

/// First row of a result set, or `NotFound`.
pub(crate) fn first<T>(rows: Vec<T>, entity: &str, id: impl ToString) -> Result<T, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(entity, id))
}

/// Whether a record with this id exists in `table`.
pub(crate) async fn record_exists<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    id: Uuid,
) -> Result<bool, DbError> {
    let mut result = db
        .query("SELECT count() AS total FROM type::record($table, $id) GROUP ALL")
        .bind(("table", table.to_string()))
        .bind(("id", id.to_string()))
        .await?;
    let rows: Vec<CountRow> = result.take(0)?;
    Ok(total(rows) > 0)
}

/// Whether the user holds at least one role in the tenant.
pub(crate) async fn is_tenant_member<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<bool, DbError> {
    let mut result = db
        .query(
            "SELECT count() AS total FROM has_role \
             WHERE in = type::record('user', $user_id) \
             AND tenant_id = $tenant_id GROUP ALL",
        )
        .bind(("user_id", user_id.to_string()))
        .bind(("tenant_id", tenant_id.to_string()))
        .await?;
    let rows: Vec<CountRow> = result.take(0)?;
    Ok(total(rows) > 0)
}

/// Whether the entity exists and belongs to the tenant.
pub(crate) async fn entity_in_tenant<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    entity_id: Uuid,
) -> Result<bool, DbError> {
    let mut result = db
        .query(
            "SELECT count() AS total FROM type::record('entity', $id) \
             WHERE tenant_id = $tenant_id GROUP ALL",
        )
        .bind(("id", entity_id.to_string()))
        .bind(("tenant_id", tenant_id.to_string()))
        .await?;
    let rows: Vec<CountRow> = result.take(0)?;
    Ok(total(rows) > 0)
}

/// Per-tenant write locks. A guarded write holds its tenant's lock from
/// the first check to the commit, so two writers in this process cannot
/// both pass a check that only one of them may pass. Clones share the
/// same locks.
#[derive(Clone, Default)]
pub(crate) struct TenantLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl TenantLocks {
    pub(crate) async fn acquire(&self, tenant_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(tenant_id).or_default())
        };
        lock.lock_owned().await
    }
}

/// An empty JSON object, the stored default for free-form documents.
pub(crate) fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uuid_reports_field() {
        let err = parse_uuid("tenant", "nope").unwrap_err();
        assert!(err.to_string().contains("tenant"));
    }

    #[test]
    fn parse_opt_uuid_passes_none_through() {
        assert!(parse_opt_uuid("team", None).unwrap().is_none());
        let id = Uuid::new_v4();
        assert_eq!(parse_opt_uuid("team", Some(id.to_string())).unwrap(), Some(id));
    }

    #[test]
    fn total_of_no_rows_is_zero() {
        assert_eq!(total(Vec::new()), 0);
        assert_eq!(total(vec![CountRow { total: 7 }]), 7);
    }

    #[tokio::test]
    async fn tenant_locks_are_shared_by_clones_and_scoped_by_tenant() {
        let locks = TenantLocks::default();
        let tenant = Uuid::new_v4();
        let _held = locks.acquire(tenant).await;

        let clone = locks.clone();
        let same_tenant = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            clone.acquire(tenant),
        )
        .await;
        assert!(same_tenant.is_err());

        let other_tenant = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            clone.acquire(Uuid::new_v4()),
        )
        .await;
        assert!(other_tenant.is_ok());
    }

    #[test]
    fn first_of_empty_is_not_found() {
        let err = first(Vec::<u8>::new(), "role", "r1").unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
