//! Server configuration

use anyhow::{Context, Result};
use priority_lib::{PRIMARY_ARTIFACT, SECONDARY_ARTIFACT};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration, read from `PRIORITY_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port for the form, prediction API and health/metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding the serialized artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Stem of the required artifact
    #[serde(default = "default_primary_artifact")]
    pub primary_artifact: String,

    /// Stem of the optional artifact
    #[serde(default = "default_secondary_artifact")]
    pub secondary_artifact: String,

    /// Largest accepted upload body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_api_port() -> u16 {
    8501
}

fn default_model_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_primary_artifact() -> String {
    PRIMARY_ARTIFACT.to_string()
}

fn default_secondary_artifact() -> String {
    SECONDARY_ARTIFACT.to_string()
}

fn default_max_upload_bytes() -> usize {
    200 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            model_dir: default_model_dir(),
            primary_artifact: default_primary_artifact(),
            secondary_artifact: default_secondary_artifact(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PRIORITY").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid PRIORITY_* configuration")
    }
}
