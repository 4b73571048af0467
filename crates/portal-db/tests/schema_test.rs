//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    portal_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in ["user", "job_posting", "referral", "asset", "asset_history"] {
        assert!(info_str.contains(table), "missing {table} table");
    }
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    portal_db::run_migrations(&db).await.unwrap();
    portal_db::run_migrations(&db).await.unwrap();

    let mut result = db
        .query("SELECT count() AS total FROM _migration GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    assert_eq!(rows[0].total, 1, "second run must not re-apply v1");
}

#[tokio::test]
async fn asset_status_is_assert_checked() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    portal_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE asset SET serial_number = 'X-1', category = 'Laptop', \
             status = 'Lost'",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "unknown status must be rejected");
}

#[tokio::test]
async fn connect_through_manager_with_memory_engine() {
    let manager = portal_db::DbManager::connect(&portal_db::DbConfig::default())
        .await
        .unwrap();

    let mut result = manager.client().query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    assert!(format!("{:?}", info).contains("asset_history"));
}
