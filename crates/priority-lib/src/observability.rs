//! Observability for the priority service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction and failure counts, loaded artifacts)
//! - Structured event logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter, register_int_counter_vec,
    GaugeVec, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Prediction modes used as metric labels
pub mod modes {
    pub const SINGLE: &str = "single";
    pub const BATCH: &str = "batch";
}

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    prediction_failures_total: IntCounterVec,
    batch_rows_total: IntCounter,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "itsm_priority_prediction_latency_seconds",
                "Time spent harmonizing input and running the model",
                &["mode"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "itsm_priority_predictions_total",
                "Number of successful prediction requests",
                &["mode"]
            )
            .expect("Failed to register predictions_total"),

            prediction_failures_total: register_int_counter_vec!(
                "itsm_priority_prediction_failures_total",
                "Number of prediction requests reported as failed",
                &["mode", "kind"]
            )
            .expect("Failed to register prediction_failures_total"),

            batch_rows_total: register_int_counter!(
                "itsm_priority_batch_rows_total",
                "Number of rows scored through batch uploads"
            )
            .expect("Failed to register batch_rows_total"),

            model_info: register_gauge_vec!(
                "itsm_priority_model_info",
                "Loaded model artifacts",
                &["artifact", "version", "role"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share
/// the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, mode: &str, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[mode])
            .observe(duration_secs);
    }

    pub fn inc_predictions(&self, mode: &str) {
        self.inner().predictions_total.with_label_values(&[mode]).inc();
    }

    pub fn inc_failures(&self, mode: &str, kind: &str) {
        self.inner()
            .prediction_failures_total
            .with_label_values(&[mode, kind])
            .inc();
    }

    pub fn add_batch_rows(&self, rows: u64) {
        self.inner().batch_rows_total.inc_by(rows);
    }

    /// Record a loaded artifact; `role` is `primary` or `secondary`
    pub fn set_model_info(&self, artifact: &str, version: &str, role: &str) {
        self.inner()
            .model_info
            .with_label_values(&[artifact, version, role])
            .set(1.0);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_dir: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_dir = %model_dir,
            "Priority service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Priority service shutting down"
        );
    }

    pub fn log_artifact_loaded(&self, artifact: &str, version: &str, checksum: &str, role: &str) {
        info!(
            event = "artifact_loaded",
            service = %self.service,
            artifact = %artifact,
            version = %version,
            checksum = %checksum,
            role = %role,
            "Loaded model artifact"
        );
    }

    pub fn log_artifact_missing(&self, artifact: &str, message: &str) {
        error!(
            event = "artifact_missing",
            service = %self.service,
            artifact = %artifact,
            error = %message,
            "Could not load required model artifact"
        );
    }

    pub fn log_prediction(&self, label: &str, confidence: Option<f32>, model: &str) {
        info!(
            event = "prediction_completed",
            service = %self.service,
            label = %label,
            confidence = ?confidence,
            model = %model,
            "Predicted ticket priority"
        );
    }

    pub fn log_batch(&self, rows: usize, model: &str, elapsed_ms: u128) {
        info!(
            event = "batch_completed",
            service = %self.service,
            rows = rows,
            model = %model,
            elapsed_ms = elapsed_ms,
            "Scored batch upload"
        );
    }

    pub fn log_failure(&self, mode: &str, kind: &str, message: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            mode = %mode,
            kind = %kind,
            error = %message,
            "Prediction failed"
        );
    }
}
