//! Subscriber setup and the server's lifecycle events.
//!
//! Every event carries `component` and `event` fields so JSON output can be
//! filtered without parsing messages.

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{env_flag, env_string, ServiceConfig};

const COMPONENT: &str = "analytics_server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// `MG_LOG_LEVEL` is an `EnvFilter` directive, so per-module levels like
/// `info,market_growth::period=debug` work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn logging_config_from_env() -> LoggingConfig {
    let defaults = LoggingConfig::default();
    LoggingConfig {
        level: env_string("MG_LOG_LEVEL").unwrap_or(defaults.level),
        format: env_string("MG_LOG_FORMAT")
            .and_then(|raw| LogFormat::parse(&raw))
            .unwrap_or(defaults.format),
        include_target: env_flag("MG_LOG_TARGET").unwrap_or(defaults.include_target),
    }
}

/// Installs the global subscriber. An unparsable level falls back to `info`.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target);

    match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().with_ansi(false).finish())?
        }
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

pub fn log_app_start(service: &ServiceConfig, logging: &LoggingConfig) {
    info!(
        component = COMPONENT,
        event = "app.start",
        requested_addr = %service.addr,
        store_path = %service.store_path.display(),
        bucket_minutes = service.bucket_minutes,
        query_timeout_ms = service.query_timeout_ms,
        log_level = %logging.level,
        log_format = ?logging.format
    );
}

pub fn log_store_opened(store_path: &Path, sample_count: u64) {
    info!(
        component = COMPONENT,
        event = "store.opened",
        store_path = %store_path.display(),
        sample_count
    );
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = COMPONENT,
        event = "app.bind",
        bind_addr = %bound_addr,
        route = "/export/analytics"
    );
}
