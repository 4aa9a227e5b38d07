//! SQLite-backed sample store and the range scan the export endpoint reads from.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{debug, info};

use crate::market_data::{truncate_to_hour, MarketSample};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored timestamp out of range: {0}")]
    InvalidTimestamp(i64),
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Half-open `[start, end)` range of `observed_at` instants to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub start: DateTime<Utc>,
    pub end_exclusive: DateTime<Utc>,
}

impl ScanRange {
    /// Whole hours from the hour of `from` through the hour of `to`.
    ///
    /// Samples before `from` are read on purpose: they seed the leading
    /// windows with the last known value.
    pub fn covering(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let start = truncate_to_hour(from);
        let last_hour = truncate_to_hour(to);
        let end_exclusive = last_hour
            .checked_add_signed(TimeDelta::hours(1))
            .unwrap_or(last_hour);
        Self {
            start,
            end_exclusive,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end_exclusive
    }
}

/// Streams samples to a sink, ordered by `observed_at` then market pair.
pub trait SampleSource: Send + Sync + 'static {
    fn scan_range(
        &self,
        range: &ScanRange,
        sink: &mut dyn FnMut(MarketSample),
    ) -> Result<u64, StoreError>;
}

pub struct SqliteSampleStore {
    conn: Mutex<Connection>,
}

impl SqliteSampleStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )?;
        ensure_schema(&conn)?;

        info!(
            component = "store",
            event = "store.open",
            path = %path.display()
        );

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts or replaces samples keyed by `(market_pair, observed_at)`.
    pub fn upsert_samples(&self, samples: &[MarketSample]) -> Result<usize, StoreError> {
        if samples.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO market_values (
                    market_pair,
                    high,
                    low,
                    volume,
                    created_ms,
                    observed_ms
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(market_pair, observed_ms) DO UPDATE SET
                    high = excluded.high,
                    low = excluded.low,
                    volume = excluded.volume,
                    created_ms = excluded.created_ms
                ",
            )?;
            for sample in samples {
                stmt.execute(params![
                    sample.market_pair,
                    sample.high,
                    sample.low,
                    sample.volume,
                    sample.created_at.timestamp_millis(),
                    sample.observed_at.timestamp_millis(),
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            component = "store",
            event = "store.upsert",
            rows = samples.len()
        );
        Ok(samples.len())
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM market_values", [], |row| {
            row.get(0)
        })?;
        Ok(count.max(0) as u64)
    }
}

impl SampleSource for SqliteSampleStore {
    fn scan_range(
        &self,
        range: &ScanRange,
        sink: &mut dyn FnMut(MarketSample),
    ) -> Result<u64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut stmt = conn.prepare_cached(
            "
            SELECT
                market_pair,
                high,
                low,
                volume,
                created_ms,
                observed_ms
            FROM market_values
            WHERE observed_ms >= ?1
              AND observed_ms < ?2
            ORDER BY observed_ms ASC, market_pair ASC
            ",
        )?;

        let mut rows = stmt.query(params![
            range.start.timestamp_millis(),
            range.end_exclusive.timestamp_millis()
        ])?;

        let mut scanned = 0u64;
        while let Some(row) = rows.next()? {
            let created_ms: i64 = row.get(4)?;
            let observed_ms: i64 = row.get(5)?;
            sink(MarketSample {
                market_pair: row.get(0)?,
                high: row.get(1)?,
                low: row.get(2)?,
                volume: row.get(3)?,
                created_at: utc_from_millis(created_ms)?,
                observed_at: utc_from_millis(observed_ms)?,
            });
            scanned += 1;
        }

        debug!(
            component = "store",
            event = "store.scan",
            start = %range.start,
            end_exclusive = %range.end_exclusive,
            rows = scanned
        );
        Ok(scanned)
    }
}

/// Process-local source, used for demos and tests.
#[derive(Clone, Default)]
pub struct InMemorySampleSource {
    inner: Arc<RwLock<Vec<MarketSample>>>,
}

impl InMemorySampleSource {
    pub fn new(mut samples: Vec<MarketSample>) -> Self {
        sort_for_scan(&mut samples);
        Self {
            inner: Arc::new(RwLock::new(samples)),
        }
    }

    pub fn replace_samples(&self, mut samples: Vec<MarketSample>) -> Result<(), StoreError> {
        sort_for_scan(&mut samples);
        let mut guard = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        *guard = samples;
        Ok(())
    }
}

impl SampleSource for InMemorySampleSource {
    fn scan_range(
        &self,
        range: &ScanRange,
        sink: &mut dyn FnMut(MarketSample),
    ) -> Result<u64, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut scanned = 0u64;
        for sample in guard.iter().filter(|s| range.contains(s.observed_at)) {
            sink(sample.clone());
            scanned += 1;
        }
        Ok(scanned)
    }
}

fn sort_for_scan(samples: &mut [MarketSample]) {
    samples.sort_by(|a, b| {
        a.observed_at
            .cmp(&b.observed_at)
            .then_with(|| a.market_pair.cmp(&b.market_pair))
    });
}

fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS market_values (
            market_pair TEXT NOT NULL,
            high REAL NOT NULL,
            low REAL NOT NULL,
            volume REAL NOT NULL,
            created_ms INTEGER NOT NULL,
            observed_ms INTEGER NOT NULL,
            PRIMARY KEY (market_pair, observed_ms)
        );
        CREATE INDEX IF NOT EXISTS idx_market_values_observed
            ON market_values (observed_ms);
        ",
    )?;
    Ok(())
}

fn utc_from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(StoreError::InvalidTimestamp(ms))
}
