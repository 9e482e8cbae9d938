use std::{env, str::FromStr, time::Duration};

use chrono_tz::Tz;
use url::Url;

use super::env::{
    AppConfig, ClassifierConfig, ConfigError, ConfigWarning, DirectoryConfig, HttpConfig,
    LoggingConfig, NewsdataConfig, RefreshConfig, RssBackendConfig,
};

pub const DEFAULT_NEWSDATA_URL: &str = "https://newsdata.io/api/1/latest";
pub const DEFAULT_RSS_BACKEND_URL: &str = "https://rss-aggregator.simplenews.workers.dev/api/news";
const DEFAULT_AUTO_REFRESH_CRON: &str = "0 */15 * * * *";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|key| env::var(key).ok())
}

impl AppConfig {
    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut warnings = Vec::new();

        let newsdata = NewsdataConfig {
            api_key: var("NEWSDATA_API_KEY"),
            base_url: endpoint(
                "NEWSDATA_BASE_URL",
                var("NEWSDATA_BASE_URL"),
                DEFAULT_NEWSDATA_URL,
            )?,
        };

        let rss_backend = RssBackendConfig {
            url: endpoint(
                "RSS_BACKEND_URL",
                var("RSS_BACKEND_URL"),
                DEFAULT_RSS_BACKEND_URL,
            )?,
        };

        let http = HttpConfig {
            timeout: Duration::from_millis(parse_or(
                "HTTP_TIMEOUT_MS",
                var("HTTP_TIMEOUT_MS"),
                15_000,
                &mut warnings,
            )),
        };

        let classifier = ClassifierConfig {
            artifact_path: var("CLASSIFIER_ARTIFACT")
                .unwrap_or_else(|| "models/news_tagger.json".to_string()),
        };

        let directories = DirectoryConfig {
            logs_dir: var("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
            data_dir: var("DATA_DIR").unwrap_or_else(|| "data".to_string()),
            db_filename: var("DB_FILENAME").unwrap_or_else(|| "simple-news.db".to_string()),
        };

        let logging = LoggingConfig {
            level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        let timezone = match var("DISPLAY_TIMEZONE") {
            Some(name) => Tz::from_str(&name).map_err(|err| ConfigError::Invalid {
                key: "DISPLAY_TIMEZONE",
                reason: err.to_string(),
            })?,
            None => Tz::UTC,
        };

        // an explicitly empty cron disables auto refresh
        let auto_refresh_cron = match lookup("AUTO_REFRESH_CRON") {
            Some(spec) if spec.trim().is_empty() => None,
            Some(spec) => Some(spec.trim().to_string()),
            None => Some(DEFAULT_AUTO_REFRESH_CRON.to_string()),
        };
        let refresh = RefreshConfig {
            cooldown: Duration::from_secs(parse_or(
                "REFRESH_COOLDOWN_SECS",
                var("REFRESH_COOLDOWN_SECS"),
                600,
                &mut warnings,
            )),
            auto_refresh_cron,
        };

        Ok(Self {
            newsdata,
            rss_backend,
            http,
            classifier,
            directories,
            logging,
            timezone,
            refresh,
            warnings,
        })
    }
}

fn endpoint(key: &'static str, value: Option<String>, default: &str) -> Result<String, ConfigError> {
    let Some(value) = value else {
        return Ok(default.to_string());
    };
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
        Ok(url) => Err(ConfigError::Invalid {
            key,
            reason: format!("unsupported scheme {}", url.scheme()),
        }),
        Err(err) => Err(ConfigError::Invalid {
            key,
            reason: err.to_string(),
        }),
    }
}

fn parse_or(
    key: &'static str,
    value: Option<String>,
    default: u64,
    warnings: &mut Vec<ConfigWarning>,
) -> u64 {
    let Some(value) = value else {
        return default;
    };
    match value.parse::<u64>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warnings.push(ConfigWarning {
                key,
                value,
                fallback: default.to_string(),
            });
            default
        }
    }
}
