//! Settings loading for the announcement toolkit
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Settings are read once per invocation; nothing is cached between runs.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "ANNOUNCE_CONFIG";
/// Environment variable overriding the database path
pub const ENV_DATABASE: &str = "ANNOUNCE_DATABASE";
/// Environment variable overriding the user table name
pub const ENV_USER_TABLE: &str = "ANNOUNCE_USER_TABLE";
/// Comma-separated app labels skipped by audience discovery
pub const ENV_EXCLUDE_APPS: &str = "ANNOUNCE_GENERATE_AUDIENCES_EXCLUDE_APPS";
/// Comma-separated table or model names skipped by audience discovery
pub const ENV_EXCLUDE_MODELS: &str = "ANNOUNCE_GENERATE_AUDIENCES_EXCLUDE_MODELS";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "ANNOUNCE_LOG_LEVEL";

const DEFAULT_USER_TABLE: &str = "users";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Raw contents of `config.toml`
///
/// All keys are optional; a missing key falls through to the compiled default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database: Option<PathBuf>,
    pub user_table: Option<String>,
    pub generate_audiences: GenerateAudiencesConfig,
    pub logging: LoggingConfig,
}

/// `[generate_audiences]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateAudiencesConfig {
    /// App labels (leading table-name segment) never turned into audiences
    pub exclude_apps: Vec<String>,
    /// Table names or model names never turned into audiences
    pub exclude_models: Vec<String>,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl TomlConfig {
    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub user_table: Option<String>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementConfig {
    /// SQLite database shared with the host application
    pub database_path: PathBuf,
    /// Host table holding users
    pub user_table: String,
    pub exclude_apps: BTreeSet<String>,
    pub exclude_models: BTreeSet<String>,
    pub log_level: String,
    /// Config file the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            user_table: DEFAULT_USER_TABLE.to_string(),
            exclude_apps: BTreeSet::new(),
            exclude_models: BTreeSet::new(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            source: None,
        }
    }
}

impl AnnouncementConfig {
    /// Resolve settings from command line, environment, config file and defaults
    ///
    /// Runs before logging is set up; the chosen file is kept in `source`
    /// for the caller to report.
    pub fn load(overrides: &CliOverrides) -> Result<Self> {
        let source = resolve_config_file(overrides.config_file.as_deref());
        let file = match &source {
            Some(path) => TomlConfig::load(path)?,
            None => TomlConfig::default(),
        };

        let mut config = Self::resolve(overrides, file)?;
        config.source = source;
        Ok(config)
    }

    /// Merge an already-parsed config file with environment and command line
    pub fn resolve(overrides: &CliOverrides, file: TomlConfig) -> Result<Self> {
        let database_path = overrides
            .database
            .clone()
            .or_else(|| env_value(ENV_DATABASE).map(PathBuf::from))
            .or(file.database)
            .unwrap_or_else(default_database_path);

        let user_table = overrides
            .user_table
            .clone()
            .or_else(|| env_value(ENV_USER_TABLE))
            .or(file.user_table)
            .unwrap_or_else(|| DEFAULT_USER_TABLE.to_string());

        if !is_valid_identifier(&user_table) {
            return Err(Error::Config(format!(
                "Invalid user table name: {:?}",
                user_table
            )));
        }

        let exclude_apps = env_list(ENV_EXCLUDE_APPS)
            .unwrap_or(file.generate_audiences.exclude_apps)
            .into_iter()
            .collect();

        let exclude_models = env_list(ENV_EXCLUDE_MODELS)
            .unwrap_or(file.generate_audiences.exclude_models)
            .into_iter()
            .collect();

        let log_level = env_value(ENV_LOG_LEVEL)
            .or(file.logging.level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            database_path,
            user_table,
            exclude_apps,
            exclude_models,
            log_level,
            source: None,
        })
    }

    pub fn is_app_excluded(&self, app_label: &str) -> bool {
        self.exclude_apps.contains(app_label)
    }

    /// A model is excluded by either its full table name or its model name
    pub fn is_model_excluded(&self, table: &str, model_name: &str) -> bool {
        self.exclude_models.contains(table) || self.exclude_models.contains(model_name)
    }
}

/// Locate the config file to load, if any
///
/// Explicit path first, then `ANNOUNCE_CONFIG`, then the per-user config
/// directory, then `/etc/announce/config.toml` on Linux. An explicitly named
/// file is returned even when it does not exist so that loading reports it.
pub fn resolve_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value(ENV_CONFIG) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("announce").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/announce/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("announce"))
        .unwrap_or_else(|| PathBuf::from("./announce_data"))
        .join("announce.db")
}

/// Plain SQL identifier: letters, digits and underscores only
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() < 100
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Comma-separated list; a set-but-empty variable clears the list
fn env_list(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let file = TomlConfig::parse(
            r#"
            database = "/srv/app/db.sqlite3"
            user_table = "auth_user"

            [generate_audiences]
            exclude_apps = ["audit"]
            exclude_models = ["shop_cart", "session"]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(file.database, Some(PathBuf::from("/srv/app/db.sqlite3")));
        assert_eq!(file.user_table.as_deref(), Some("auth_user"));
        assert_eq!(file.generate_audiences.exclude_apps, vec!["audit"]);
        assert_eq!(file.generate_audiences.exclude_models.len(), 2);
        assert_eq!(file.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let file = TomlConfig::parse("").unwrap();
        assert!(file.database.is_none());
        assert!(file.generate_audiences.exclude_apps.is_empty());
    }

    #[test]
    fn test_parse_malformed_config() {
        let err = TomlConfig::parse("user_table = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("users"));
        assert!(is_valid_identifier("auth_user"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("users; DROP TABLE x"));
        assert!(!is_valid_identifier("1users"));
        assert!(!is_valid_identifier("user-table"));
    }

    #[test]
    fn test_model_exclusion_matches_table_or_model() {
        let config = AnnouncementConfig {
            exclude_models: ["shop_order".to_string(), "comment".to_string()]
                .into_iter()
                .collect(),
            ..AnnouncementConfig::default()
        };

        assert!(config.is_model_excluded("shop_order", "order"));
        assert!(config.is_model_excluded("blog_comment", "comment"));
        assert!(!config.is_model_excluded("blog_post", "post"));
    }

    #[test]
    fn test_default_database_path_is_named() {
        let path = default_database_path();
        assert_eq!(path.file_name().unwrap(), "announce.db");
    }
}
