use std::io;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::AppConfig, infrastructure::directories::ResolvedPaths};

pub const LOG_FILE_PREFIX: &str = "news.log";

static INIT: OnceCell<()> = OnceCell::new();
static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Console plus a daily-rolling file under the logs directory. Safe to call twice.
pub fn init_tracing(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    INIT.get_or_try_init::<_, anyhow::Error>(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let file_appender = tracing_appender::rolling::daily(&paths.logs_dir, LOG_FILE_PREFIX);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        let _ = FILE_GUARD.set(guard);

        let console_layer = fmt::layer()
            .with_writer(io::stdout)
            .with_target(true)
            .with_ansi(true);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::info!(
            target: "lifecycle",
            logs = %paths.logs_dir.display(),
            data = %paths.data_dir.display(),
            level = %config.logging.level,
            timezone = %config.timezone,
            "tracing initialized"
        );
        // config is read before a subscriber exists
        for warning in &config.warnings {
            tracing::warn!(
                target: "lifecycle",
                key = warning.key,
                value = %warning.value,
                fallback = %warning.fallback,
                "unparsable number; using default"
            );
        }
        Ok(())
    })?;
    Ok(())
}
