//! API client for communicating with the priority server

use anyhow::{Context, Result};
use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// API client for the priority server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let response = ensure_success(response).await?;
        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request whose body is meaningful on 503 as well
    pub async fn get_status<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let response = if status == StatusCode::SERVICE_UNAVAILABLE {
            response
        } else {
            ensure_success(response).await?
        };

        Ok((status, response.json().await.context("Failed to parse response")?))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let response = ensure_success(response).await?;
        response.json().await.context("Failed to parse response")
    }

    /// POST a CSV body and return the CSV the server answers with
    pub async fn post_csv(&self, path: &str, csv: Vec<u8>) -> Result<Vec<u8>> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "text/csv")
            .body(csv)
            .send()
            .await
            .context("Failed to send request")?;

        let response = ensure_success(response).await?;
        let bytes = response.bytes().await.context("Failed to read response")?;
        Ok(bytes.to_vec())
    }
}

/// Turn non-2xx answers into errors, preferring the server's message
async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => anyhow::bail!("API error ({}): {}", status, error.message),
        Err(_) => anyhow::bail!("API error ({}): {}", status, body),
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRequest {
    pub impact: u8,
    pub urgency: u8,
    pub reassignments: u32,
    pub handle_time_hrs: f64,
    pub related_interactions: u32,
    pub related_incidents: u32,
    pub related_changes: u32,
    pub status: String,
    pub category: String,
    pub closure_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub label: String,
    pub raw: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<serde_json::Value>,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub supports_proba: bool,
    pub loaded_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub critical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
