//! `/export/analytics` HTTP route.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::metrics::WindowSummary;
use crate::period::{PeriodError, WindowSet};
use crate::store::{SampleSource, ScanRange, StoreError};
use crate::validate::{ExportQuery, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportConfig {
    pub bucket_width: TimeDelta,
    pub query_timeout: StdDuration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bucket_width: TimeDelta::minutes(5),
            query_timeout: StdDuration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("can't process: {0}")]
    Period(#[from] PeriodError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("store query timed out after {0:?}")]
    Timeout(StdDuration),
    #[error("export task failed: {0}")]
    Task(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Period(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(_) | Self::Timeout(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

pub fn analytics_router(source: Arc<dyn SampleSource>, config: ExportConfig) -> Router {
    Router::new()
        .route("/export/analytics", get(get_export_analytics))
        .with_state(AnalyticsAppState { source, config })
}

/// Builds the windows for `[from, to)`, streams the covering store range
/// through them and derives the summaries. Blocking; run off the async runtime.
pub fn export_summaries(
    source: &dyn SampleSource,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    bucket_width: TimeDelta,
) -> Result<(Vec<WindowSummary>, u64), ApiError> {
    let windows = WindowSet::build(from, to, bucket_width)?;
    let range = ScanRange::covering(from, to);
    Ok(fill_windows(source, windows, &range)?)
}

fn fill_windows(
    source: &dyn SampleSource,
    mut windows: WindowSet,
    range: &ScanRange,
) -> Result<(Vec<WindowSummary>, u64), StoreError> {
    let scanned = source.scan_range(range, &mut |sample| windows.ingest(&sample))?;
    Ok((windows.derive_summaries(), scanned))
}

#[derive(Clone)]
struct AnalyticsAppState {
    source: Arc<dyn SampleSource>,
    config: ExportConfig,
}

async fn get_export_analytics(
    State(state): State<AnalyticsAppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<Vec<WindowSummary>>, ApiError> {
    info!(
        component = "analytics_api",
        event = "http.export.request",
        from = query.from.as_deref().unwrap_or("-"),
        to = query.to.as_deref().unwrap_or("-"),
        format = query.format.as_deref().unwrap_or("-")
    );

    match run_export(&state, &query).await {
        Ok((summaries, scanned)) => {
            info!(
                component = "analytics_api",
                event = "http.export.finish",
                window_count = summaries.len(),
                samples_scanned = scanned
            );
            Ok(Json(summaries))
        }
        Err(err) => {
            if err.status() == StatusCode::UNPROCESSABLE_ENTITY {
                warn!(
                    component = "analytics_api",
                    event = "http.export.rejected",
                    error = %err
                );
            } else {
                warn!(
                    component = "analytics_api",
                    event = "http.export.store_error",
                    error = %err
                );
            }
            Err(err)
        }
    }
}

async fn run_export(
    state: &AnalyticsAppState,
    query: &ExportQuery,
) -> Result<(Vec<WindowSummary>, u64), ApiError> {
    let req = query.validate()?;
    // An empty minute range is rejected here, before the store is touched.
    let windows = WindowSet::build(req.from, req.to, state.config.bucket_width)?;
    let range = ScanRange::covering(req.from, req.to);

    let source = Arc::clone(&state.source);
    let task =
        tokio::task::spawn_blocking(move || fill_windows(source.as_ref(), windows, &range));

    match tokio::time::timeout(state.config.query_timeout, task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(join_err)) => Err(ApiError::Task(join_err.to_string())),
        Err(_) => Err(ApiError::Timeout(state.config.query_timeout)),
    }
}
