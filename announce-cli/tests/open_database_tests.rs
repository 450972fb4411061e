//! Opening the host database from the command line

use announce_cli::open_database;
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_database_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.db");

    let err = open_database(&path).await.unwrap_err();

    assert!(err.to_string().contains("Database not found"));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_existing_database_gets_toolkit_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("host.db");
    std::fs::File::create(&path).unwrap();

    let pool = open_database(&path).await.unwrap();

    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'announcement_%'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(tables, 7);
    pool.close().await;
}
