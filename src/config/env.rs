use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub newsdata: NewsdataConfig,
    pub rss_backend: RssBackendConfig,
    pub http: HttpConfig,
    pub classifier: ClassifierConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub timezone: Tz,
    pub refresh: RefreshConfig,
    /// Values that were ignored while loading; logged once tracing is up.
    pub warnings: Vec<ConfigWarning>,
}

#[derive(Debug, Clone)]
pub struct NewsdataConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct RssBackendConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub artifact_path: String,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub cooldown: Duration,
    /// `None` disables the background refresh job.
    pub auto_refresh_cron: Option<String>,
}

/// A set but unusable value that was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: &'static str,
    pub value: String,
    pub fallback: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
