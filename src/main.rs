use std::sync::Arc;

use access_logger::{config::AppConfig, server, telemetry, TracingSink};
use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    let log_format = match std::env::var("LOG_FORMAT") {
        Ok(format) => format.parse()?,
        Err(_) => config.logging.format,
    };
    telemetry::init_tracing(log_format)?;
    info!("Configuration loaded successfully");

    server::serve(config, Arc::new(TracingSink)).await
}
