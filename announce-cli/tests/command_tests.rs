//! Command behavior against an in-memory host database with scripted input

use announce_cli::commands::{self, Outcome, PostArgs};
use announce_cli::Console;
use announce_common::db::init_schema;
use announce_common::AnnouncementConfig;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

async fn host_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    for sql in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL)",
        "CREATE TABLE shop_order (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL REFERENCES users(id))",
        "CREATE TABLE blog_post (id INTEGER PRIMARY KEY, author_id INTEGER REFERENCES users(id))",
        "INSERT INTO users (id, email) VALUES (1, 'a@example.com'), (2, 'b@example.com'), (3, 'c@example.com')",
        "INSERT INTO shop_order (user_id) VALUES (1), (2), (2)",
        "INSERT INTO blog_post (author_id) VALUES (2)",
    ] {
        sqlx::query(sql).execute(&pool).await.unwrap();
    }

    init_schema(&pool).await.unwrap();
    pool
}

fn console(input: &str, assume_yes: bool) -> Console<&[u8], Vec<u8>> {
    Console::new(input.as_bytes(), Vec::new(), assume_yes)
}

fn output(console: Console<&[u8], Vec<u8>>) -> String {
    String::from_utf8(console.into_output()).unwrap()
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_generate_audiences_after_invalid_answer() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();

    let mut c = console("maybe\ny\n", false);
    let outcome = commands::generate_audiences(&pool, &config, &mut c).await.unwrap();
    let text = output(c);

    assert_eq!(outcome, Outcome::Completed);
    assert!(text.contains("1. Post (blog_post)"));
    assert!(text.contains("2. Order (shop_order)"));
    assert!(text.contains("Invalid input. Please type 'y' (Yes) or 'n' (No)."));
    assert!(text.contains("Created audience: Post"));
    assert!(text.contains("Created audience: Order"));
    assert!(text.trim_end().ends_with("Finished creating audiences!"));
    assert_eq!(count(&pool, "announcement_audience").await, 2);
}

#[tokio::test]
async fn test_generate_audiences_declined_writes_nothing() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();

    let mut c = console("N\n", false);
    let outcome = commands::generate_audiences(&pool, &config, &mut c).await.unwrap();
    let text = output(c);

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(text.contains("generate_audiences.exclude_models"));
    assert!(!text.contains("Created audience"));
    assert_eq!(count(&pool, "announcement_audience").await, 0);
}

#[tokio::test]
async fn test_generate_audiences_rerun_reports_nothing_new() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();

    let mut c = console("", true);
    commands::generate_audiences(&pool, &config, &mut c).await.unwrap();

    let mut c = console("", true);
    let outcome = commands::generate_audiences(&pool, &config, &mut c).await.unwrap();
    let text = output(c);

    assert_eq!(outcome, Outcome::Completed);
    assert!(text.contains("No new audiences needed to be created."));
    assert_eq!(count(&pool, "announcement_audience").await, 2);
}

#[tokio::test]
async fn test_generate_audiences_with_everything_excluded() {
    let pool = host_db().await;
    let mut config = AnnouncementConfig::default();
    config.exclude_apps.insert("shop".to_string());
    config.exclude_models.insert("post".to_string());

    let mut c = console("", false);
    let outcome = commands::generate_audiences(&pool, &config, &mut c).await.unwrap();

    assert_eq!(outcome, Outcome::NothingToDo);
    assert_eq!(
        output(c).trim_end(),
        "No related models found to create audiences."
    );
}

#[tokio::test]
async fn test_generate_profiles_requires_audiences() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();

    let mut c = console("y\n", false);
    let outcome = commands::generate_profiles(&pool, &config, &mut c).await.unwrap();
    let text = output(c);

    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(outcome.exit_code(), std::process::ExitCode::FAILURE);
    assert!(text.contains("run the 'generate-audiences' command first"));
    assert_eq!(count(&pool, "announcement_profile").await, 0);
}

#[tokio::test]
async fn test_generate_profiles_end_of_input_cancels() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();
    commands::generate_audiences(&pool, &config, &mut console("", true))
        .await
        .unwrap();

    let mut c = console("", false);
    let outcome = commands::generate_profiles(&pool, &config, &mut c).await.unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(output(c).contains("No changes made."));
    assert_eq!(count(&pool, "announcement_profile").await, 0);
}

#[tokio::test]
async fn test_generate_profiles_then_show_profile() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();
    commands::generate_audiences(&pool, &config, &mut console("", true))
        .await
        .unwrap();

    let mut c = console("", true);
    let outcome = commands::generate_profiles(&pool, &config, &mut c).await.unwrap();
    let text = output(c);

    assert_eq!(outcome, Outcome::Completed);
    assert!(text.contains("Related users: 2, profiles created: 2, memberships added: 3"));
    assert!(text.contains("All users have been assigned to audiences successfully."));

    let mut c = console("", false);
    commands::show_profile(&pool, "2", false, &mut c).await.unwrap();
    let text = output(c);
    assert!(text.contains("User:     2"));
    assert!(text.contains("  - Order"));
    assert!(text.contains("  - Post"));

    let mut c = console("", false);
    commands::show_profile(&pool, "1", true, &mut c).await.unwrap();
    let view: serde_json::Value = serde_json::from_str(&output(c)).unwrap();
    assert_eq!(view["user_id"], "1");
    assert_eq!(view["audiences"].as_array().unwrap().len(), 1);
    assert_eq!(view["audiences"][0]["name"], "Order");

    let mut c = console("", false);
    let outcome = commands::show_profile(&pool, "3", false, &mut c).await.unwrap();
    assert_eq!(outcome, Outcome::Failed);
}

#[tokio::test]
async fn test_list_audiences_json_counts_members() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();
    commands::generate_audiences(&pool, &config, &mut console("", true))
        .await
        .unwrap();
    commands::generate_profiles(&pool, &config, &mut console("", true))
        .await
        .unwrap();

    let mut c = console("", false);
    commands::list_audiences(&pool, true, &mut c).await.unwrap();
    let listed: serde_json::Value = serde_json::from_str(&output(c)).unwrap();
    let listed = listed.as_array().unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "Order");
    assert_eq!(listed[0]["members"], 2);
    assert_eq!(listed[1]["name"], "Post");
    assert_eq!(listed[1]["members"], 1);
    assert_eq!(listed[1]["description"], "Auto-created audience for Post");
}

#[tokio::test]
async fn test_post_and_feed() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();
    commands::generate_audiences(&pool, &config, &mut console("", true))
        .await
        .unwrap();
    commands::generate_profiles(&pool, &config, &mut console("", true))
        .await
        .unwrap();

    let now = Utc::now().naive_utc();

    let mut c = console("", false);
    let outcome = commands::post(
        &pool,
        PostArgs {
            title: "Writers' meetup".to_string(),
            content: "Friday at six".to_string(),
            audiences: vec!["Post".to_string(), "Newsletter".to_string()],
            category: None,
            published_at: None,
            expires_at: None,
        },
        &mut c,
    )
    .await
    .unwrap();
    assert_eq!(outcome, Outcome::Failed);
    assert!(output(c).contains("Unknown audience(s): Newsletter"));
    assert_eq!(count(&pool, "announcement_announcement").await, 0);

    let mut c = console("", false);
    let outcome = commands::post(
        &pool,
        PostArgs {
            title: "Writers' meetup".to_string(),
            content: "Friday at six".to_string(),
            audiences: vec!["Post".to_string()],
            category: Some("Events".to_string()),
            published_at: Some(now - Duration::minutes(5)),
            expires_at: Some(now + Duration::days(3)),
        },
        &mut c,
    )
    .await
    .unwrap();
    assert_eq!(outcome, Outcome::Completed);

    let mut c = console("", false);
    commands::feed(&pool, "2", now, false, &mut c).await.unwrap();
    let text = output(c);
    assert!(text.contains("Writers' meetup"));
    assert!(text.contains("    Friday at six"));

    let mut c = console("", false);
    let outcome = commands::feed(&pool, "1", now, false, &mut c).await.unwrap();
    assert_eq!(outcome, Outcome::NothingToDo);
    assert!(output(c).contains("No active announcements for user '1'."));
}

#[tokio::test]
async fn test_rejected_post_writes_nothing() {
    let pool = host_db().await;
    let config = AnnouncementConfig::default();
    commands::generate_audiences(&pool, &config, &mut console("", true))
        .await
        .unwrap();

    let mut c = console("", false);
    let outcome = commands::post(
        &pool,
        PostArgs {
            title: "Old news".to_string(),
            content: "Already over".to_string(),
            audiences: vec!["Order".to_string()],
            category: Some("Brand New".to_string()),
            published_at: None,
            expires_at: Some(Utc::now().naive_utc() - Duration::hours(1)),
        },
        &mut c,
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Failed);
    assert!(output(c).contains("Invalid announcement"));
    assert_eq!(count(&pool, "announcement_category").await, 0);
    assert_eq!(count(&pool, "announcement_announcement").await, 0);
}
