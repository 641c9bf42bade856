//! Batch CSV scoring command

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::client::ApiClient;
use crate::output::{print_info, print_success, print_warning, records_table, OutputFormat};

/// Rows of the scored file echoed to the terminal
pub const PREVIEW_ROWS: usize = 10;

/// A scored CSV, cut down to the rows worth printing
#[derive(Debug, PartialEq)]
struct Preview {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    total: usize,
}

/// Upload `input`, save the scored CSV to `output` and print its first rows
pub async fn score_file(
    client: &ApiClient,
    input: &Path,
    output: &Path,
    format: OutputFormat,
) -> Result<()> {
    let csv = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let scored = client.post_csv("api/v1/predict/batch", csv).await?;

    std::fs::write(output, &scored)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let preview = preview(&scored, PREVIEW_ROWS)?;

    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Map<String, serde_json::Value>> = preview
                .rows
                .iter()
                .map(|row| {
                    preview
                        .headers
                        .iter()
                        .cloned()
                        .zip(row.iter().cloned().map(serde_json::Value::String))
                        .collect()
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            print_success(&format!(
                "Scored {} rows, predictions written to {}",
                preview.total,
                output.display()
            ));

            if preview.rows.is_empty() {
                print_warning("The uploaded file has no data rows");
                return Ok(());
            }

            println!();
            println!("{}", "Preview".bold());
            println!("{}", records_table(&preview.headers, &preview.rows));
            if preview.total > preview.rows.len() {
                print_info(&format!(
                    "Showing first {} of {} rows",
                    preview.rows.len(),
                    preview.total
                ));
            }
        }
    }

    Ok(())
}

fn preview(csv: &[u8], limit: usize) -> Result<Preview> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(csv);

    let headers = reader
        .headers()
        .context("Server returned an unreadable CSV header")?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    let mut total = 0;
    for record in reader.records() {
        let record = record.context("Server returned an unreadable CSV row")?;
        if rows.len() < limit {
            rows.push(record.iter().map(String::from).collect());
        }
        total += 1;
    }

    Ok(Preview {
        headers,
        rows,
        total,
    })
}
