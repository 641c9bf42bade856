//! Single-ticket prediction command

use anyhow::Result;

use crate::client::{ApiClient, PredictionResponse, TicketRequest};
use crate::output::{color_confidence, color_priority, print_info, OutputFormat};

/// Predict the priority of one ticket
pub async fn predict(client: &ApiClient, ticket: &TicketRequest, format: OutputFormat) -> Result<()> {
    let result: PredictionResponse = client.post("api/v1/predict", ticket).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let mut line = format!("Predicted Priority: {}", color_priority(&result.label));
            if let Some(confidence) = result.confidence {
                line.push_str(&format!(" • Confidence: {}", color_confidence(confidence)));
            }
            println!("{}", line);

            if let Some(secondary) = &result.secondary {
                print_info(&format!(
                    "Secondary model prediction: {}",
                    display_value(secondary)
                ));
            }
            println!("Model version: {}", result.model_version);
        }
    }

    Ok(())
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
