//! Market pair growth analytics over arbitrary time windows.
//!
//! - `period`: window bucketing, boundary tracking and growth derivation
//! - `store`: SQLite sample store and the range scan feeding the windows
//! - `api`: the `/export/analytics` route

mod api;
mod config;
mod import;
mod market_data;
mod metrics;
mod observability;
mod period;
mod store;
mod validate;

#[cfg(test)]
mod test_env;

pub use api::{analytics_router, export_summaries, ApiError, ExportConfig};
pub use config::{
    service_config_from_env, ConfigError, ServiceConfig, DEFAULT_PORT, DEFAULT_STORE_PATH,
};
pub use import::{import_csv_file, read_samples_csv, ImportError, ImportReport};
pub use market_data::{truncate_to_hour, truncate_to_minute, MarketSample};
pub use metrics::{growth_rate, GrowthMetric, MarketPairMetric, WindowSummary};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_store_opened, logging_config_from_env,
    LogFormat, LoggingConfig, LoggingInitError,
};
pub use period::{BoundaryPair, PeriodError, Window, WindowSet};
pub use store::{InMemorySampleSource, SampleSource, ScanRange, SqliteSampleStore, StoreError};
pub use validate::{
    parse_query_time, ExportQuery, ExportRequest, ValidationError, QUERY_TIME_FORMAT,
    SUPPORTED_FORMAT,
};
