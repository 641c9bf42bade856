//! Error types for table handling, artifact loading and prediction

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or (de)serializing a [`Frame`](crate::frame::Frame)
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("No columns to parse from file")]
    NoColumns,

    #[error("Expected {expected} fields in line {line}, saw {found}")]
    RowWidth {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Column '{column}' has {found} values but the table has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write CSV output: {0}")]
    Write(String),
}

/// Errors raised by a classifier while encoding input or running inference
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("feature '{0}' is missing from the input table")]
    MissingFeature(String),

    #[error("column '{column}' expects a number but got '{value}'")]
    NotNumeric { column: String, value: String },

    #[error("categorical column '{0}' has no vocabulary in the pipeline manifest")]
    MissingVocabulary(String),

    #[error("pipeline manifest declares {declared} features but the schema encodes {encoded}")]
    FeatureWidth { declared: usize, encoded: usize },

    #[error("model returned {found} predictions for {expected} rows")]
    OutputLength { expected: usize, found: usize },

    #[error("model produced no class label")]
    NoLabel,

    #[error("probability index {0} has no entry in the manifest classes")]
    UnknownClassIndex(usize),

    #[error("model does not support {0}")]
    Unsupported(&'static str),

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),
}

/// Errors raised while locating or loading a serialized artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(
        "Required artifact not found: {file}. Make sure the training run saved it to the model directory."
    )]
    NotFound { file: String },

    #[error("Failed to read artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline manifest {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not load model '{name}': {source}")]
    Model {
        name: String,
        #[source]
        source: ClassifierError,
    },
}

/// A reported, non-fatal prediction failure
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Invalid ticket record: {0}")]
    InvalidRecord(#[from] validator::ValidationErrors),

    #[error("Prediction failed. Ensure your model was trained with these feature names.\n{0}")]
    Single(#[source] ClassifierError),

    #[error("Batch prediction failed: {0}")]
    BatchInput(#[from] FrameError),

    #[error("Batch prediction failed: {0}")]
    BatchModel(#[source] ClassifierError),
}

impl PredictError {
    /// Short machine-readable kind, used for metrics labels and API bodies
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::InvalidRecord(_) => "invalid_record",
            PredictError::Single(_) => "schema_mismatch",
            PredictError::BatchInput(_) => "malformed_upload",
            PredictError::BatchModel(_) => "schema_mismatch",
        }
    }

    /// True when the caller sent something unusable rather than the model failing
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::InvalidRecord(_))
    }
}
