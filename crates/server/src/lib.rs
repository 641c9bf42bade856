//! ITSM ticket priority service
//!
//! Serves the single-record form, CSV batch scoring and the JSON
//! prediction API on top of `priority-lib`.

pub mod api;
pub mod config;
pub mod pages;

use anyhow::Result;
use api::AppState;
use config::ServerConfig;
use priority_lib::{
    health::{components, HealthRegistry},
    ArtifactStore, PredictionService, ServiceMetrics, StructuredLogger,
};
use tracing::info;

/// Load the artifacts named by `config` and assemble the shared state.
///
/// A missing or unreadable primary artifact is logged, marked unhealthy and
/// returned as an error; the secondary artifact is used only if it loads.
pub async fn bootstrap(
    config: &ServerConfig,
    health_registry: &HealthRegistry,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
) -> Result<AppState> {
    health_registry
        .register_critical(components::PRIMARY_MODEL)
        .await;
    health_registry
        .register_optional(components::SECONDARY_MODEL)
        .await;

    let store = ArtifactStore::new(config.model_dir.clone());

    let primary = match store.load_required(&config.primary_artifact) {
        Ok(artifact) => artifact,
        Err(e) => {
            let message = e.to_string();
            logger.log_artifact_missing(&config.primary_artifact, &message);
            health_registry
                .set_unhealthy(components::PRIMARY_MODEL, message)
                .await;
            return Err(e.into());
        }
    };
    logger.log_artifact_loaded(
        &primary.info.name,
        &primary.info.version,
        &primary.info.checksum,
        "primary",
    );
    metrics.set_model_info(&primary.info.name, &primary.info.version, "primary");

    let secondary = store.load_optional(&config.secondary_artifact);
    match &secondary {
        Some(artifact) => {
            logger.log_artifact_loaded(
                &artifact.info.name,
                &artifact.info.version,
                &artifact.info.checksum,
                "secondary",
            );
            metrics.set_model_info(&artifact.info.name, &artifact.info.version, "secondary");
        }
        None => {
            health_registry
                .set_healthy(components::SECONDARY_MODEL, Some("not loaded".to_string()))
                .await;
        }
    }

    let mut artifacts = vec![primary.info.clone()];
    artifacts.extend(secondary.as_ref().map(|a| a.info.clone()));

    let service = PredictionService::new(primary.as_classifier())
        .with_secondary(secondary.as_ref().map(|a| a.as_classifier()))
        .with_metrics(metrics)
        .with_logger(logger);

    info!(
        models = artifacts.len(),
        model_dir = ?config.model_dir,
        "Prediction service assembled"
    );

    Ok(AppState::new(
        service,
        artifacts,
        health_registry.clone(),
        config.max_upload_bytes,
    ))
}
