//! Time bucketing and per-window boundary tracking for growth metrics.
//!
//! A [`WindowSet`] partitions `[from, to)` into contiguous windows of a fixed
//! width (the last one may be narrower). Samples are pushed in with
//! [`WindowSet::ingest`] and each window keeps, per market pair, a left and a
//! right boundary sample. [`WindowSet::derive_summaries`] turns the boundary
//! pairs into percentage growth figures.
//!
//! Ingestion is order sensitive. A sample rewrites both boundaries of every
//! window that starts after it, so a sample delivered late can replace the
//! boundaries that newer samples already set in later windows. Feed samples
//! in ascending `observed_at` order (the SQLite store does), or hand a batch
//! to [`WindowSet::ingest_chronological`].

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::debug;

use crate::market_data::{truncate_to_minute, MarketSample};
use crate::metrics::{growth_rate, GrowthMetric, MarketPairMetric, WindowSummary};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("'from' ({from}) must be before 'to' ({to}) at minute precision")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    #[error("bucket width must be positive, got {width}")]
    InvalidBucketWidth { width: TimeDelta },
}

/// Left/right boundary samples of one market pair inside one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryPair {
    left: Option<MarketSample>,
    right: Option<MarketSample>,
}

impl BoundaryPair {
    pub fn left(&self) -> Option<&MarketSample> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&MarketSample> {
        self.right.as_ref()
    }

    /// `None` when either side is unset or the left side would divide by zero.
    pub fn growth(&self) -> Option<GrowthMetric> {
        let left = self.left.as_ref().filter(|s| !s.is_unobserved())?;
        let right = self.right.as_ref().filter(|s| !s.is_unobserved())?;
        if left.volume == 0.0 || left.high == 0.0 || left.low == 0.0 {
            return None;
        }

        Some(GrowthMetric {
            volume_growth: growth_rate(left.volume, right.volume),
            high_growth: growth_rate(left.high, right.high),
            low_growth: growth_rate(left.low, right.low),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    pairs: BTreeMap<String, BoundaryPair>,
}

impl Window {
    fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            pairs: BTreeMap::new(),
        }
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn width(&self) -> TimeDelta {
        self.to - self.from
    }

    pub fn pair(&self, market_pair: &str) -> Option<&BoundaryPair> {
        self.pairs.get(market_pair)
    }

    pub fn market_pairs(&self) -> impl Iterator<Item = &str> {
        self.pairs.keys().map(String::as_str)
    }

    fn pair_mut(&mut self, market_pair: &str) -> &mut BoundaryPair {
        self.pairs.entry(market_pair.to_string()).or_default()
    }

    fn summarize(&self) -> WindowSummary {
        let metrics = self
            .pairs
            .iter()
            .filter_map(|(market_pair, pair)| {
                pair.growth().map(|metric| MarketPairMetric {
                    market_pair: market_pair.clone(),
                    metric,
                })
            })
            .collect();

        WindowSummary {
            from: self.from,
            to: self.to,
            metrics,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    windows: Vec<Window>,
}

impl WindowSet {
    /// Splits `[from, to)` into windows of `bucket_width`.
    ///
    /// Both bounds are truncated to the minute first. The final window is
    /// clamped to `to` and keeps whatever remainder is left.
    pub fn build(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        bucket_width: TimeDelta,
    ) -> Result<Self, PeriodError> {
        if bucket_width <= TimeDelta::zero() {
            return Err(PeriodError::InvalidBucketWidth {
                width: bucket_width,
            });
        }

        let from = truncate_to_minute(from);
        let to = truncate_to_minute(to);
        if from >= to {
            return Err(PeriodError::InvalidRange { from, to });
        }

        let mut windows = Vec::new();
        let mut cursor = from;
        while cursor < to {
            let end = cursor
                .checked_add_signed(bucket_width)
                .map_or(to, |next| next.min(to));
            windows.push(Window::new(cursor, end));
            cursor = end;
        }

        debug!(
            component = "period",
            event = "period.build",
            from = %from,
            to = %to,
            bucket_ms = bucket_width.num_milliseconds(),
            window_count = windows.len()
        );

        Ok(Self { windows })
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Records `sample` against every window.
    ///
    /// Per window, by the sample's minute `ts`:
    /// - before the window: both boundaries become the sample
    /// - at the window start: left boundary
    /// - inside the window or at its end: right boundary, and the next
    ///   window's left boundary
    /// - after the window end: untouched
    ///
    /// The market pair key is created in every window regardless.
    pub fn ingest(&mut self, sample: &MarketSample) {
        let ts = sample.bucket_ts();
        let key = sample.market_pair.as_str();

        for idx in 0..self.windows.len() {
            let window = &mut self.windows[idx];
            let (from, to) = (window.from, window.to);
            let pair = window.pair_mut(key);

            let mut propagate = false;
            if ts < from {
                pair.left = Some(sample.clone());
                pair.right = Some(sample.clone());
            } else if ts == from {
                pair.left = Some(sample.clone());
            } else if ts <= to {
                pair.right = Some(sample.clone());
                propagate = true;
            }

            if propagate {
                if let Some(next) = self.windows.get_mut(idx + 1) {
                    next.pair_mut(key).left = Some(sample.clone());
                }
            }
        }
    }

    /// Ingests a batch in ascending minute order; ties keep their input order.
    pub fn ingest_chronological<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = MarketSample>,
    {
        let mut batch: Vec<MarketSample> = samples.into_iter().collect();
        batch.sort_by_key(MarketSample::bucket_ts);
        for sample in &batch {
            self.ingest(sample);
        }
    }

    /// One summary per window, in window order. Market pairs inside a window
    /// are listed by name; pairs without a usable boundary pair are left out.
    pub fn derive_summaries(&self) -> Vec<WindowSummary> {
        self.windows.iter().map(Window::summarize).collect()
    }
}
