//! Model and health inspection commands

use anyhow::Result;
use colored::Colorize;
use reqwest::StatusCode;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthReport, ModelList};
use crate::output::{color_status, format_bytes, format_timestamp, print_table, OutputFormat};

/// Row for the model table
#[derive(Tabled, Serialize)]
struct ModelRow {
    #[tabled(rename = "Artifact")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Loaded")]
    loaded_at: String,
}

/// Row for the component health table
#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Critical")]
    critical: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show the artifacts the server has loaded
pub async fn show_models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: ModelList = client.get("api/v1/model").await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            let rows: Vec<ModelRow> = result
                .models
                .iter()
                .map(|m| ModelRow {
                    name: m.name.clone(),
                    version: m.version.clone(),
                    checksum: m.checksum.chars().take(12).collect(),
                    size: format_bytes(m.size_bytes),
                    confidence: if m.supports_proba { "yes" } else { "no" }.to_string(),
                    loaded_at: format_timestamp(m.loaded_at),
                })
                .collect();
            print_table(&rows, format);
        }
    }

    Ok(())
}

/// Show service health; fails when the service reports itself unavailable
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (code, report): (StatusCode, HealthReport) = client.get_status("healthz").await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{} {}", "Service:".bold(), color_status(&report.status));

            let mut rows: Vec<ComponentRow> = report
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    critical: if c.critical { "yes" } else { "no" }.to_string(),
                    message: c.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows, format);
        }
    }

    if code == StatusCode::SERVICE_UNAVAILABLE {
        anyhow::bail!("Service is unhealthy");
    }

    Ok(())
}
