//! CSV loading for seeding the sample store.
//!
//! Expected header: `marketname,high,low,volume,created,timestamp`, with
//! RFC 3339 instants.

use std::fs;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::market_data::MarketSample;
use crate::store::{SqliteSampleStore, StoreError};

const IMPORT_BATCH_SIZE: usize = 5_000;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: empty market pair name")]
    EmptyMarketPair { row: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub rows_read: usize,
    pub rows_written: usize,
    pub unobserved_rows: usize,
}

pub fn read_samples_csv<R: Read>(reader: R) -> Result<Vec<MarketSample>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (idx, record) in reader.deserialize::<MarketSample>().enumerate() {
        let sample = record?;
        if sample.market_pair.is_empty() {
            return Err(ImportError::EmptyMarketPair { row: idx + 1 });
        }
        samples.push(sample);
    }

    Ok(samples)
}

pub fn import_csv_file(
    store: &SqliteSampleStore,
    csv_path: &Path,
) -> Result<ImportReport, ImportError> {
    let file = fs::File::open(csv_path)?;
    let samples = read_samples_csv(file)?;

    let mut rows_written = 0;
    for chunk in samples.chunks(IMPORT_BATCH_SIZE) {
        rows_written += store.upsert_samples(chunk)?;
    }

    let report = ImportReport {
        rows_read: samples.len(),
        rows_written,
        unobserved_rows: samples.iter().filter(|s| s.is_unobserved()).count(),
    };

    info!(
        component = "import",
        event = "import.finish",
        csv_path = %csv_path.display(),
        rows_read = report.rows_read,
        rows_written = report.rows_written,
        unobserved_rows = report.unobserved_rows
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_feed_header() {
        let body = "marketname,high,low,volume,created,timestamp\n\
                    BTC-ETH, 0.031, 0.030, 120.5, 2019-03-01T10:00:00Z, 2019-03-01T10:00:12Z\n\
                    BTC-LTC,0.012,0.011,88,2019-03-01T10:00:00Z,2019-03-01T10:01:00Z\n";

        let samples = read_samples_csv(body.as_bytes()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].market_pair, "BTC-ETH");
        assert_eq!(samples[0].volume, 120.5);
        assert_eq!(samples[1].low, 0.011);
    }

    #[test]
    fn rejects_rows_without_market_pair() {
        let body = "marketname,high,low,volume,created,timestamp\n\
                    ,1,1,1,2019-03-01T10:00:00Z,2019-03-01T10:00:00Z\n";

        let err = read_samples_csv(body.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::EmptyMarketPair { row: 1 }));
    }

    #[test]
    fn malformed_numbers_surface_as_csv_errors() {
        let body = "marketname,high,low,volume,created,timestamp\n\
                    BTC-ETH,high,1,1,2019-03-01T10:00:00Z,2019-03-01T10:00:00Z\n";

        assert!(matches!(
            read_samples_csv(body.as_bytes()).unwrap_err(),
            ImportError::Csv(_)
        ));
    }
}
