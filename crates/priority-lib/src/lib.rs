//! Library for ITSM ticket priority inference
//!
//! This crate provides the core functionality for:
//! - Reading ticket tables from CSV
//! - Harmonizing input columns against the trained schema
//! - Loading ONNX pipeline artifacts and running inference
//! - Single-record and batch prediction orchestration
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod frame;
pub mod harmonize;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use artifacts::{ArtifactInfo, ArtifactStore, LoadedArtifact, PRIMARY_ARTIFACT, SECONDARY_ARTIFACT};
pub use error::{ArtifactError, ClassifierError, FrameError, PredictError};
pub use frame::{Cell, Frame};
pub use harmonize::{HarmonizeReport, Harmonizer, Schema};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{
    BatchPrediction, ClassValue, Classifier, PredictionService, SinglePrediction,
    DEFAULT_PREVIEW_ROWS, DOWNLOAD_FILE_NAME, PREDICTION_COLUMN,
};
