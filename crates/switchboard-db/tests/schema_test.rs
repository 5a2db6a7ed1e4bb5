//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    switchboard_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "tenant",
        "user",
        "role",
        "role_exception",
        "team_membership",
        "entity",
        "screen_asset",
        "transaction_definition",
        "transaction_instance",
        "reference_item",
        "log_entry",
        "health_check",
        "has_role",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    switchboard_db::run_migrations(&db).await.unwrap();
    switchboard_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_slugs() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    switchboard_db::run_migrations(&db).await.unwrap();

    db.query("CREATE tenant SET name = 'Acme', slug = 'acme'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query("CREATE tenant SET name = 'Acme Two', slug = 'acme'")
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "duplicate slug should be rejected");
}

#[tokio::test]
async fn log_entries_reject_unknown_categories() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    switchboard_db::run_migrations(&db).await.unwrap();

    let result = db
        .query("CREATE log_entry SET category = 'debug', action = 'x', message = 'x'")
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "category outside the closed set should fail");
}
