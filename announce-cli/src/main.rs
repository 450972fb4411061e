//! announce - audience reconciliation and announcement tooling for a host database
//!
//! Discovers host tables related to the user table, keeps one audience per
//! such table, and attaches users to the audiences of the tables they have
//! rows in. Operator output goes to stdout, logs to stderr.

use announce_cli::commands::{self, PostArgs};
use announce_cli::{open_database, Console};
use announce_common::config::CliOverrides;
use announce_common::AnnouncementConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "announce",
    about = "Derive announcement audiences from existing user relationships",
    version
)]
struct Cli {
    /// Config file (default: ANNOUNCE_CONFIG, then the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Host database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// Host table holding the users
    #[arg(long, global = true)]
    user_table: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create one audience per table related to the user table
    GenerateAudiences {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Give related users a profile and attach them to their audiences
    GenerateProfiles {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// List audiences with their member counts
    ListAudiences {
        #[arg(long)]
        json: bool,
    },
    /// Show a user's profile and audiences
    ShowProfile {
        /// User primary key as stored in the user table
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Post an announcement to one or more audiences
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Target audience name (repeatable)
        #[arg(long = "audience", required = true)]
        audiences: Vec<String>,
        /// Category name, created if missing
        #[arg(long)]
        category: Option<String>,
        /// Publication time (RFC 3339, default now)
        #[arg(long, value_parser = parse_timestamp)]
        publish_at: Option<NaiveDateTime>,
        /// Expiry time (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        expires_at: Option<NaiveDateTime>,
    },
    /// Show the active announcements a user would see
    Feed {
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
}

/// RFC 3339 timestamp, stored as naive UTC
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc).naive_utc())
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,announce={level},announce_cli={level},announce_common={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        config_file: cli.config.clone(),
        database: cli.database.clone(),
        user_table: cli.user_table.clone(),
    };
    let config = AnnouncementConfig::load(&overrides).context("Failed to load configuration")?;

    init_tracing(&config.log_level);

    info!("announce v{} starting", env!("CARGO_PKG_VERSION"));
    match &config.source {
        Some(path) => info!("Loaded config file: {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }
    info!("Database path: {}", config.database_path.display());

    let pool = open_database(&config.database_path).await?;

    let assume_yes = matches!(
        cli.command,
        Command::GenerateAudiences { yes: true } | Command::GenerateProfiles { yes: true }
    );
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock(), assume_yes);

    let outcome = match cli.command {
        Command::GenerateAudiences { .. } => {
            commands::generate_audiences(&pool, &config, &mut console).await?
        }
        Command::GenerateProfiles { .. } => {
            commands::generate_profiles(&pool, &config, &mut console).await?
        }
        Command::ListAudiences { json } => commands::list_audiences(&pool, json, &mut console).await?,
        Command::ShowProfile { user, json } => {
            commands::show_profile(&pool, &user, json, &mut console).await?
        }
        Command::Post {
            title,
            content,
            audiences,
            category,
            publish_at,
            expires_at,
        } => {
            let args = PostArgs {
                title,
                content,
                audiences,
                category,
                published_at: publish_at,
                expires_at,
            };
            commands::post(&pool, args, &mut console).await?
        }
        Command::Feed { user, json } => {
            let now = Utc::now().naive_utc();
            commands::feed(&pool, &user, now, json, &mut console).await?
        }
    };

    pool.close().await;
    Ok(outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_timestamp_normalises_to_utc() {
        let parsed = parse_timestamp("2026-03-01T12:00:00+02:00").unwrap();
        assert_eq!(parsed.to_string(), "2026-03-01 10:00:00");
        assert!(parse_timestamp("tomorrow").is_err());
    }

    #[test]
    fn test_post_requires_an_audience() {
        let result = Cli::try_parse_from(["announce", "post", "--title", "t", "--content", "c"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "announce", "post", "--title", "t", "--content", "c", "--audience", "Order",
            "--audience", "Post",
        ])
        .unwrap();
        match cli.command {
            Command::Post { audiences, .. } => assert_eq!(audiences, vec!["Order", "Post"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "announce", "generate-profiles", "--yes", "--user-table", "accounts",
        ])
        .unwrap();
        assert_eq!(cli.user_table.as_deref(), Some("accounts"));
        assert!(matches!(cli.command, Command::GenerateProfiles { yes: true }));
    }
}
