//! Priority server - ITSM ticket priority inference
//!
//! Loads the trained pipeline artifacts once at startup and serves the
//! browser form, batch CSV scoring and the JSON API.

use anyhow::Result;
use priority_lib::{health::HealthRegistry, ServiceMetrics, StructuredLogger};
use priority_server::{api, bootstrap, config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::ServerConfig::load()?;

    let logger = StructuredLogger::new("priority-server");
    logger.log_startup(SERVER_VERSION, &config.model_dir.display().to_string());

    let health_registry = HealthRegistry::new();
    let metrics = ServiceMetrics::new();

    let app_state = bootstrap(&config, &health_registry, metrics, logger.clone()).await?;
    let app_state = Arc::new(app_state);

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
            info!("Shutting down");
        }
    }

    Ok(())
}
