//! Integration tests for reference data, the audit log and health checks
//! using in-memory SurrealDB.

use chrono::{Duration, Utc};
use switchboard_core::error::SwitchboardError;
use switchboard_core::models::audit::{
    CreateHealthCheck, CreateLogEntry, HealthStatus, LogCategory,
};
use switchboard_core::models::reference::{
    CreateReferenceItem, ReferenceKind, UpdateReferenceItem,
};
use switchboard_core::repository::{
    AuditLogRepository, HealthCheckRepository, LogFilter, Pagination, ReferenceRepository,
};
use switchboard_db::repository::{
    SurrealAuditLogRepository, SurrealHealthCheckRepository, SurrealReferenceRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    switchboard_db::run_migrations(&db).await.unwrap();
    db
}

fn item(code: &str, name: &str, parent_code: Option<&str>) -> CreateReferenceItem {
    CreateReferenceItem {
        code: code.into(),
        name: name.into(),
        parent_code: parent_code.map(Into::into),
        symbol: None,
    }
}

#[tokio::test]
async fn country_codes_are_normalized_and_unique() {
    let db = setup().await;
    let reference = SurrealReferenceRepository::new(db);

    let kenya = reference
        .create(ReferenceKind::Country, item("ke", "Kenya", None))
        .await
        .unwrap();
    assert_eq!(kenya.code, "KE");

    let found = reference.get_by_code(ReferenceKind::Country, "Ke").await.unwrap();
    assert_eq!(found.id, kenya.id);

    let err = reference
        .create(ReferenceKind::Country, item("KE", "Kenya again", None))
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::AlreadyExists { .. }));

    // Same code under another kind is a different item.
    let err = reference.get_by_id(ReferenceKind::Currency, kenya.id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));
}

#[tokio::test]
async fn cities_belong_to_known_countries() {
    let db = setup().await;
    let reference = SurrealReferenceRepository::new(db);

    let err = reference
        .create(ReferenceKind::City, item("NBO", "Nairobi", Some("KE")))
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::Validation { .. }));

    let kenya = reference
        .create(ReferenceKind::Country, item("KE", "Kenya", None))
        .await
        .unwrap();
    reference
        .create(ReferenceKind::Country, item("UG", "Uganda", None))
        .await
        .unwrap();
    reference
        .create(ReferenceKind::City, item("NBO", "Nairobi", Some("ke")))
        .await
        .unwrap();
    reference
        .create(ReferenceKind::City, item("MBA", "Mombasa", Some("KE")))
        .await
        .unwrap();
    reference
        .create(ReferenceKind::City, item("KLA", "Kampala", Some("UG")))
        .await
        .unwrap();

    let kenyan = reference
        .list(ReferenceKind::City, Some("ke".into()), Pagination::default())
        .await
        .unwrap();
    assert_eq!(kenyan.total, 2);
    let names: Vec<_> = kenyan.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Mombasa", "Nairobi"]);

    let err = reference.delete(ReferenceKind::Country, kenya.id).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::Conflict { .. }));
}

#[tokio::test]
async fn currency_update_and_delete() {
    let db = setup().await;
    let reference = SurrealReferenceRepository::new(db);

    let shilling = reference
        .create(
            ReferenceKind::Currency,
            CreateReferenceItem {
                code: "kes".into(),
                name: "Kenyan shilling".into(),
                parent_code: None,
                symbol: Some("KSh".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(shilling.code, "KES");

    let updated = reference
        .update(
            ReferenceKind::Currency,
            shilling.id,
            UpdateReferenceItem {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.symbol.as_deref(), Some("KSh"));

    reference.delete(ReferenceKind::Currency, shilling.id).await.unwrap();
    let page = reference
        .list(ReferenceKind::Currency, None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn audit_log_filters_and_orders_newest_first() {
    let db = setup().await;
    let logs = SurrealAuditLogRepository::new(db);

    let tenant_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    logs.append(CreateLogEntry::activity(tenant_id, user_id, "role.create"))
        .await
        .unwrap();
    logs.append(CreateLogEntry {
        tenant_id: Some(tenant_id),
        user_id: Some(user_id),
        category: LogCategory::Access,
        action: "GET /api/tenants".into(),
        method: Some("GET".into()),
        path: Some("/api/tenants".into()),
        status: Some(200),
        duration_ms: Some(12),
        message: "request completed".into(),
        metadata: None,
    })
    .await
    .unwrap();
    logs.append(CreateLogEntry::activity(Uuid::new_v4(), user_id, "team.create"))
        .await
        .unwrap();

    let scoped = logs
        .list(
            LogFilter {
                tenant_id: Some(tenant_id),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(scoped.total, 2);
    assert!(scoped.items[0].timestamp >= scoped.items[1].timestamp);

    let access = logs
        .list(
            LogFilter {
                tenant_id: Some(tenant_id),
                category: Some(LogCategory::Access),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(access.total, 1);
    assert_eq!(access.items[0].status, Some(200));
    assert_eq!(access.items[0].duration_ms, Some(12));
    assert!(access.items[0].metadata.is_object());

    let future = logs
        .list(
            LogFilter {
                from: Some(Utc::now() + Duration::hours(1)),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(future.total, 0);
}

#[tokio::test]
async fn health_checks_list_most_recent_first() {
    let db = setup().await;
    let health = SurrealHealthCheckRepository::new(db);

    for (component, status) in [
        ("database", HealthStatus::Healthy),
        ("database", HealthStatus::Degraded),
        ("database", HealthStatus::Unhealthy),
    ] {
        health
            .record(CreateHealthCheck {
                component: component.into(),
                status,
                latency_ms: 3,
                detail: None,
            })
            .await
            .unwrap();
    }

    let recent = health.list_recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].checked_at >= recent[1].checked_at);
}
