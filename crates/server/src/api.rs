//! HTTP API: browser form, prediction endpoints, health checks and Prometheus metrics

use crate::pages::{self, Notice};
use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartError,
        rejection::{FormRejection, JsonRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use priority_lib::{
    health::{ComponentStatus, HealthRegistry},
    ArtifactInfo, PredictError, PredictionService, TicketRecord, DOWNLOAD_FILE_NAME,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Multipart field carrying the uploaded CSV
const UPLOAD_FIELD: &str = "file";

/// Shared application state
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub artifacts: Vec<ArtifactInfo>,
    pub health_registry: HealthRegistry,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        service: PredictionService,
        artifacts: Vec<ArtifactInfo>,
        health_registry: HealthRegistry,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            service: Arc::new(service),
            artifacts,
            health_registry,
            max_upload_bytes,
        }
    }
}

/// Errors surfaced by the JSON endpoints
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Predict(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Predict(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Predict(e) => e.kind(),
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ModelResponse<'a> {
    models: &'a [ArtifactInfo],
}

/// Landing page with both forms
async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::index(
        &state.artifacts,
        &TicketRecord::default(),
        Notice::None,
    ))
}

/// Single-record form submission
async fn predict_form(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TicketRecord>, FormRejection>,
) -> Response {
    let Form(record) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return (StatusCode::BAD_REQUEST, Html(pages::error(&rejection.body_text())))
                .into_response()
        }
    };

    match state.service.predict_record(&record) {
        Ok(prediction) => Html(pages::index(
            &state.artifacts,
            &record,
            Notice::Prediction(&prediction),
        ))
        .into_response(),
        Err(e) => {
            let e = ApiError::Predict(e);
            let page = pages::index(&state.artifacts, &record, Notice::Error(&e.to_string()));
            (e.status(), Html(page)).into_response()
        }
    }
}

/// CSV upload from the browser form
async fn batch_upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let result = match read_upload(multipart).await {
        Ok(upload) => score_csv(&state, upload).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(csv) => csv_attachment(csv),
        Err(e) => (e.status(), Html(pages::error(&e.to_string()))).into_response(),
    }
}

/// JSON single-record prediction
async fn api_predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TicketRecord>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(record) = payload?;
    let prediction = state.service.predict_record(&record)?;
    Ok(Json(prediction).into_response())
}

/// Raw CSV body prediction
async fn api_predict_batch(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let csv = score_csv(&state, body).await?;
    Ok(csv_attachment(csv))
}

/// Loaded artifact descriptions
async fn model_info(State(state): State<Arc<AppState>>) -> Response {
    Json(ModelResponse {
        models: &state.artifacts,
    })
    .into_response()
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // optional model missing
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response())
}

/// Pull the CSV out of the `file` field
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            return Ok(field.bytes().await?);
        }
    }
    Err(ApiError::BadRequest(format!(
        "No CSV uploaded; expected a multipart field named `{}`",
        UPLOAD_FIELD
    )))
}

/// Run a CSV upload through the batch path off the async workers
async fn score_csv(state: &AppState, upload: Bytes) -> Result<Vec<u8>, ApiError> {
    let service = state.service.clone();

    let scored = tokio::task::spawn_blocking(move || {
        let batch = service.predict_csv(upload.as_ref())?;
        batch.to_csv()
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Batch worker panicked");
        ApiError::Internal(e.to_string())
    })?;

    Ok(scored?)
}

fn csv_attachment(csv: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/batch", post(batch_upload))
        .route("/api/v1/predict", post(api_predict))
        .route("/api/v1/predict/batch", post(api_predict_batch))
        .route("/api/v1/model", get(model_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
