use std::path::PathBuf;

use market_growth::{
    import_csv_file, init_logging, logging_config_from_env, SqliteSampleStore, DEFAULT_STORE_PATH,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;

    let mut args = std::env::args().skip(1);
    let csv_path = args
        .next()
        .map(PathBuf::from)
        .ok_or("usage: market_store_import <values.csv> [store.sqlite]")?;
    let store_path = args
        .next()
        .or_else(|| std::env::var("MG_STORE_PATH").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

    let store = SqliteSampleStore::open(&store_path)?;
    let report = import_csv_file(&store, &csv_path)?;

    println!(
        "Imported {} rows from {} into {} ({} all-zero rows kept) | store total={}",
        report.rows_written,
        csv_path.display(),
        store_path.display(),
        report.unobserved_rows,
        store.count()?
    );

    Ok(())
}
