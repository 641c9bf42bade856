//! Priority prediction engine

mod encoder;
mod inference;
mod orchestrator;
mod output;

pub use encoder::{FeatureEncoder, PipelineManifest};
pub use inference::{OnnxClassifier, MAX_INFERENCE_MS};
pub use orchestrator::{
    BatchPrediction, PredictionService, SinglePrediction, DEFAULT_PREVIEW_ROWS, DOWNLOAD_FILE_NAME,
    PREDICTION_COLUMN,
};
pub use output::{LabelFormatter, PRIORITY_LABELS};

use crate::error::ClassifierError;
use crate::frame::{Cell, Frame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw class value as produced by a model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassValue {
    Int(i64),
    Text(String),
}

impl ClassValue {
    /// Integer view of the value, accepting integer-like text such as `"3"`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ClassValue::Int(v) => Some(*v),
            ClassValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0 && f.is_finite())
                        .map(|f| f as i64)
                })
            }
        }
    }
}

impl fmt::Display for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassValue::Int(v) => write!(f, "{}", v),
            ClassValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<ClassValue> for Cell {
    fn from(value: ClassValue) -> Self {
        match value {
            ClassValue::Int(v) => Cell::Number(v as f64),
            ClassValue::Text(s) => Cell::Text(s),
        }
    }
}

/// A loaded classification model.
///
/// `predict` is required; `predict_proba` is an optional capability and
/// reports [`ClassifierError::Unsupported`] by default.
pub trait Classifier: Send + Sync {
    /// Artifact name, for logs and model info
    fn name(&self) -> &str;

    /// Manifest version of the loaded artifact
    fn version(&self) -> &str {
        "unknown"
    }

    /// One class value per input row
    fn predict(&self, frame: &Frame) -> Result<Vec<ClassValue>, ClassifierError>;

    /// One probability distribution per input row
    fn predict_proba(&self, _frame: &Frame) -> Result<Vec<Vec<f32>>, ClassifierError> {
        Err(ClassifierError::Unsupported("predict_proba"))
    }

    fn supports_proba(&self) -> bool {
        false
    }
}
