use std::sync::Arc;

use market_growth::{
    analytics_router, init_logging, log_app_bind, log_app_start, log_store_opened,
    logging_config_from_env, service_config_from_env, SampleSource, SqliteSampleStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;

    let cfg = service_config_from_env()?;
    log_app_start(&cfg, &logging_cfg);

    let store = SqliteSampleStore::open(&cfg.store_path)?;
    log_store_opened(&cfg.store_path, store.count()?);

    let source: Arc<dyn SampleSource> = Arc::new(store);
    let app = analytics_router(source, cfg.export_config());
    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
