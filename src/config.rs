//! Service configuration read from `MG_*` environment variables.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::TimeDelta;
use thiserror::Error;

use crate::api::ExportConfig;

pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_STORE_PATH: &str = "data/market_values.sqlite";
const DEFAULT_BUCKET_MINUTES: i64 = 5;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub store_path: PathBuf,
    pub bucket_minutes: i64,
    pub query_timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid MG_ADDR '{value}': {source}")]
    InvalidAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            bucket_minutes: DEFAULT_BUCKET_MINUTES,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
        }
    }
}

impl ServiceConfig {
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            bucket_width: TimeDelta::minutes(self.bucket_minutes),
            query_timeout: StdDuration::from_millis(self.query_timeout_ms),
        }
    }
}

pub fn service_config_from_env() -> Result<ServiceConfig, ConfigError> {
    let defaults = ServiceConfig::default();

    let addr = match env_string("MG_ADDR") {
        Some(raw) => raw
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidAddr { value: raw, source })?,
        None => defaults.addr,
    };

    let store_path = env_string("MG_STORE_PATH")
        .map(PathBuf::from)
        .unwrap_or(defaults.store_path);

    let bucket_minutes = env_string("MG_BUCKET_MINUTES")
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|minutes| *minutes > 0)
        .unwrap_or(defaults.bucket_minutes);

    let query_timeout_ms = env_string("MG_QUERY_TIMEOUT_MS")
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(defaults.query_timeout_ms);

    Ok(ServiceConfig {
        addr,
        store_path,
        bucket_minutes,
        query_timeout_ms,
    })
}

/// Trimmed value of `name`; unset and blank both read as `None`.
pub(crate) fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// `1/true/yes/on` or `0/false/no/off`, case-insensitive. Anything else is `None`.
pub(crate) fn env_flag(name: &str) -> Option<bool> {
    match env_string(name)?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
