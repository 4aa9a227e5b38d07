//! Market value observations as read from the sample store.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One observed value set for a market pair.
///
/// Field names on the wire follow the upstream feed (`marketname`, `created`,
/// `timestamp`), which is also the CSV header used by the importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSample {
    #[serde(rename = "marketname")]
    pub market_pair: String,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

impl MarketSample {
    pub fn new(
        market_pair: impl Into<String>,
        high: f64,
        low: f64,
        volume: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            market_pair: market_pair.into(),
            high,
            low,
            volume,
            created_at: observed_at,
            observed_at,
        }
    }

    /// All-zero values mean the feed had nothing for this slot.
    pub fn is_unobserved(&self) -> bool {
        self.high == 0.0 && self.low == 0.0 && self.volume == 0.0
    }

    /// The instant used for bucketing: `observed_at` floored to the minute.
    pub fn bucket_ts(&self) -> DateTime<Utc> {
        truncate_to_minute(self.observed_at)
    }
}

pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

pub fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    truncate_to_minute(ts).with_minute(0).unwrap_or(ts)
}
