//! Database file creation and reopening

use announce_common::db::init::init_database;
use announce_common::db::migrations::get_schema_version;
use tempfile::TempDir;

const TOOLKIT_TABLES: &[&str] = &[
    "announcement_announcement",
    "announcement_audience",
    "announcement_audience_announcement",
    "announcement_category",
    "announcement_profile",
    "announcement_schema_version",
    "announcement_user_audience",
];

#[tokio::test]
async fn test_database_created_with_toolkit_tables() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("host.db");

    let pool = init_database(&db_path).await.expect("Database initialization failed");
    assert!(db_path.exists(), "Database file was not created");

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'announcement_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(tables, TOOLKIT_TABLES);
    assert!(get_schema_version(&pool).await.unwrap() > 0);
}

#[tokio::test]
async fn test_reopen_keeps_host_tables_and_data() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("host.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO announcement_audience (guid, name) VALUES ('00000000-0000-4000-8000-000000000001', 'Staff')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.expect("Failed to reopen database");

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'users'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 1);

    let audiences: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM announcement_audience")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(audiences, 1);
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fk.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO announcement_user_audience (guid, profile_id, audience_id) VALUES ('a', 'missing', 'missing')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Dangling membership should be rejected");
}
