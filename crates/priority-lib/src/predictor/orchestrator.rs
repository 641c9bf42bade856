//! Prediction orchestration for the single-record and batch paths

use super::output::LabelFormatter;
use super::{ClassValue, Classifier};
use crate::error::{ClassifierError, PredictError};
use crate::frame::{Cell, Frame};
use crate::harmonize::Harmonizer;
use crate::models::TicketRecord;
use crate::observability::{modes, ServiceMetrics, StructuredLogger};
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use validator::Validate;

/// Column appended to batch results
pub const PREDICTION_COLUMN: &str = "Predicted_Priority";

/// Rows shown when previewing batch results
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// File name offered for downloaded batch results
pub const DOWNLOAD_FILE_NAME: &str = "itsm_predictions.csv";

/// Result of the single-record path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinglePrediction {
    /// Display label, e.g. `3-Medium`
    pub label: String,
    /// Raw class value returned by the model
    pub raw: ClassValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Raw prediction of the secondary model, when one is loaded and succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<ClassValue>,
    pub model_version: String,
}

impl SinglePrediction {
    pub fn summary(&self) -> String {
        LabelFormatter::summary(&self.label, self.confidence)
    }
}

/// Result of the batch path: the harmonized table plus a prediction column
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPrediction {
    pub frame: Frame,
}

impl BatchPrediction {
    pub fn rows(&self) -> usize {
        self.frame.len()
    }

    pub fn preview(&self, rows: usize) -> Frame {
        self.frame.head(rows)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, PredictError> {
        Ok(self.frame.to_csv_bytes()?)
    }
}

/// Runs harmonized tables through the loaded models
pub struct PredictionService {
    primary: Arc<dyn Classifier>,
    secondary: Option<Arc<dyn Classifier>>,
    harmonizer: Harmonizer,
    labels: LabelFormatter,
    metrics: Option<ServiceMetrics>,
    logger: Option<StructuredLogger>,
}

impl PredictionService {
    pub fn new(primary: Arc<dyn Classifier>) -> Self {
        Self {
            primary,
            secondary: None,
            harmonizer: Harmonizer::default(),
            labels: LabelFormatter::new(),
            metrics: None,
            logger: None,
        }
    }

    pub fn with_secondary(mut self, secondary: Option<Arc<dyn Classifier>>) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn with_labels(mut self, labels: LabelFormatter) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_metrics(mut self, metrics: ServiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validate a form record and predict its priority
    pub fn predict_record(&self, record: &TicketRecord) -> Result<SinglePrediction, PredictError> {
        if let Err(e) = record.validate() {
            let err = PredictError::from(e);
            self.record_failure(modes::SINGLE, &err);
            return Err(err);
        }
        self.predict_row(&record.to_frame())
    }

    /// Predict the first row of `frame`.
    ///
    /// Confidence is omitted when the model has no probability output; a
    /// failing secondary model is ignored.
    pub fn predict_row(&self, frame: &Frame) -> Result<SinglePrediction, PredictError> {
        let start = Instant::now();
        let row = self.harmonized(&frame.head(1));

        let result = self.primary.predict(&row).and_then(|values| {
            values.into_iter().next().ok_or(ClassifierError::OutputLength {
                expected: 1,
                found: 0,
            })
        });
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                let err = PredictError::Single(e);
                self.record_failure(modes::SINGLE, &err);
                return Err(err);
            }
        };

        let confidence = match self.primary.predict_proba(&row) {
            Ok(probs) => LabelFormatter::confidence(&probs),
            Err(e) => {
                debug!(error = %e, "Confidence unavailable");
                None
            }
        };

        let secondary = self.secondary.as_ref().and_then(|model| {
            match model.predict(&row) {
                Ok(values) => values.into_iter().next(),
                Err(e) => {
                    debug!(model = %model.name(), error = %e, "Secondary model prediction skipped");
                    None
                }
            }
        });

        let prediction = SinglePrediction {
            label: self.labels.display_label(&raw),
            raw,
            confidence,
            secondary,
            model_version: self.primary.version().to_string(),
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe_prediction_latency(modes::SINGLE, start.elapsed().as_secs_f64());
            metrics.inc_predictions(modes::SINGLE);
        }
        if let Some(logger) = &self.logger {
            logger.log_prediction(&prediction.label, prediction.confidence, self.primary.name());
        }

        Ok(prediction)
    }

    /// Harmonize a table, predict every row and append [`PREDICTION_COLUMN`]
    pub fn predict_frame(&self, frame: &Frame) -> Result<BatchPrediction, PredictError> {
        let start = Instant::now();
        let mut out = self.harmonized(frame);

        let result = self.primary.predict(&out).and_then(|values| {
            if values.len() == out.len() {
                Ok(values)
            } else {
                Err(ClassifierError::OutputLength {
                    expected: out.len(),
                    found: values.len(),
                })
            }
        });
        let values = match result {
            Ok(values) => values,
            Err(e) => {
                let err = PredictError::BatchModel(e);
                self.record_failure(modes::BATCH, &err);
                return Err(err);
            }
        };

        let cells: Vec<Cell> = values.into_iter().map(Cell::from).collect();
        if let Err(e) = out.set_column(PREDICTION_COLUMN, cells) {
            let err = PredictError::from(e);
            self.record_failure(modes::BATCH, &err);
            return Err(err);
        }

        let elapsed = start.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.observe_prediction_latency(modes::BATCH, elapsed.as_secs_f64());
            metrics.inc_predictions(modes::BATCH);
            metrics.add_batch_rows(out.len() as u64);
        }
        if let Some(logger) = &self.logger {
            logger.log_batch(out.len(), self.primary.name(), elapsed.as_millis());
        }

        Ok(BatchPrediction { frame: out })
    }

    /// Parse an uploaded CSV document and run the batch path over it
    pub fn predict_csv<R: Read>(&self, reader: R) -> Result<BatchPrediction, PredictError> {
        match Frame::from_csv_reader(reader) {
            Ok(frame) => self.predict_frame(&frame),
            Err(e) => {
                let err = PredictError::from(e);
                self.record_failure(modes::BATCH, &err);
                Err(err)
            }
        }
    }

    fn harmonized(&self, frame: &Frame) -> Frame {
        let (out, report) = self.harmonizer.harmonize_with_report(frame);
        if !report.is_clean() {
            debug!(
                aliased = ?report.aliased,
                mirrored = ?report.mirrored,
                defaulted = ?report.defaulted,
                dropped = ?report.dropped,
                "Harmonized input columns"
            );
        }
        out
    }

    fn record_failure(&self, mode: &str, err: &PredictError) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_failures(mode, err.kind());
        }
        if let Some(logger) = &self.logger {
            logger.log_failure(mode, err.kind(), &err.to_string());
        }
    }
}
