use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::scanner::format_backup_date;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_SAFETY_MARGIN_BYTES: u64 = 10_000_000;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Tree archived into `data.zip`.
    pub source_dir: PathBuf,
    /// Database store on disk. Only measured, never read directly.
    pub database_dir: PathBuf,
    pub backup_root: PathBuf,
    pub log_root: PathBuf,
    pub database: DatabaseConfig,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_safety_margin_bytes")]
    pub safety_margin_bytes: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_dump_program")]
    pub dump_program: String,
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_safety_margin_bytes() -> u64 {
    DEFAULT_SAFETY_MARGIN_BYTES
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_dump_program() -> String {
    "mysqldump".to_string()
}

impl AppConfig {
    /// Build a configuration with every tunable at its default.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        database_dir: impl Into<PathBuf>,
        backup_root: impl Into<PathBuf>,
        log_root: impl Into<PathBuf>,
        database: DatabaseConfig,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            database_dir: database_dir.into(),
            backup_root: backup_root.into(),
            log_root: log_root.into(),
            database,
            retention_days: DEFAULT_RETENTION_DAYS,
            date_format: default_date_format(),
            safety_margin_bytes: DEFAULT_SAFETY_MARGIN_BYTES,
            log_level: default_log_level(),
        }
    }

    /// Reject settings that would only fail once a run is under way.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sample = NaiveDate::from_ymd_opt(2000, 1, 31).unwrap_or_default();
        format_backup_date(sample, &self.date_format)
            .map_err(|e| ConfigError::Message(format!("date_format: {}", e)))?;
        Ok(())
    }

    /// Copy with the database password masked, suitable for printing.
    pub fn redacted(&self) -> AppConfig {
        let mut copy = self.clone();
        if !copy.database.password.is_empty() {
            copy.database.password = "********".to_string();
        }
        copy
    }
}

impl DatabaseConfig {
    pub fn new(user: &str, password: &str, name: &str) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            host: default_host(),
            dump_program: default_dump_program(),
        }
    }
}

/// Load configuration from `Config.toml` (or `path`), then `BACKUP_*` environment variables.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file_source = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };
    let builder = Config::builder()
        .add_source(file_source)
        .add_source(Environment::with_prefix("BACKUP").separator("__"))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}
