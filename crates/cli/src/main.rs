//! ITSM Ticket Priority CLI
//!
//! A command-line tool for scoring tickets against a running priority
//! server, one at a time or as a CSV batch.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{batch, predict, status};
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:8501";

/// ITSM Ticket Priority CLI
#[derive(Parser)]
#[command(name = "itsm-priority")]
#[command(author, version, about = "CLI for the ITSM Ticket Priority service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via ITSM_API_URL env var or the config file)
    #[arg(long, env = "ITSM_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the priority of a single ticket
    Predict(TicketArgs),

    /// Score a CSV file and download the predictions
    Batch {
        /// CSV file to upload
        input: PathBuf,

        /// Where to write the scored CSV
        #[arg(long, short, default_value = "itsm_predictions.csv")]
        output: PathBuf,
    },

    /// Show the loaded model artifacts
    Model,

    /// Show service health
    Health,
}

#[derive(clap::Args)]
pub struct TicketArgs {
    /// Impact (1-5)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub impact: u8,

    /// Urgency (1-5)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub urgency: u8,

    /// No_of_Reassignments
    #[arg(long, default_value_t = 0)]
    pub reassignments: u32,

    /// Handle_Time_hrs
    #[arg(long, default_value_t = 0.0)]
    pub handle_time: f64,

    /// No_of_Related_Interactions
    #[arg(long, default_value_t = 0)]
    pub related_interactions: u32,

    /// No_of_Related_Incidents
    #[arg(long, default_value_t = 0)]
    pub related_incidents: u32,

    /// No_of_Related_Changes
    #[arg(long, default_value_t = 0)]
    pub related_changes: u32,

    /// Status
    #[arg(long, default_value = "Open", value_parser = ["Open", "Resolved", "Closed"])]
    pub status: String,

    /// Category
    #[arg(long, default_value = "incident")]
    pub category: String,

    /// Closure_Code
    #[arg(long, default_value = "Other")]
    pub closure_code: String,
}

impl From<TicketArgs> for client::TicketRequest {
    fn from(args: TicketArgs) -> Self {
        Self {
            impact: args.impact,
            urgency: args.urgency,
            reassignments: args.reassignments,
            handle_time_hrs: args.handle_time,
            related_interactions: args.related_interactions,
            related_incidents: args.related_incidents,
            related_changes: args.related_changes,
            status: args.status,
            category: args.category,
            closure_code: args.closure_code,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    // Flags and env win over the config file
    let api_url = cli
        .api_url
        .or(config.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = match cli.format {
        Some(format) => format,
        None => config
            .default_format
            .as_deref()
            .and_then(|f| output::OutputFormat::from_str(f, true).ok())
            .unwrap_or_default(),
    };

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Predict(ticket) => {
            predict::predict(&client, &ticket.into(), format).await?;
        }
        Commands::Batch { input, output } => {
            batch::score_file(&client, &input, &output, format).await?;
        }
        Commands::Model => {
            status::show_models(&client, format).await?;
        }
        Commands::Health => {
            status::show_health(&client, format).await?;
        }
    }

    Ok(())
}
