//! Plant Alert Dispatcher - Main Entry Point

use api::settings::ServiceConfig;
use api::{init_logging, run_server};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config file: first argument, else PLANT_ALERT_CONFIG
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PLANT_ALERT_CONFIG").ok())
        .map(PathBuf::from);

    let config = ServiceConfig::load(path.as_deref())?;
    init_logging(&config.log_level, config.log_json)?;

    info!("=== Plant Alert Dispatcher v{} ===", env!("CARGO_PKG_VERSION"));
    match &config.actuator_url {
        Some(url) => info!("Pump controller at {}", url),
        None => info!("Running without a pump controller"),
    }

    run_server(config).await?;

    Ok(())
}
