//! Print a clarity report for a prompt as JSON.
//!
//! Calls a deployed service when `CLARITY_API_BASE_URL` (or `--base-url`) is
//! set, otherwise generates in-process with the configured Gemini credential.

use anyhow::Context;
use clap::Parser;
use clarity_service::config::ClarityConfig;
use clarity_service::services::{ClarityGenerator, ReportClient};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clarity-report")]
#[command(about = "Turn a free-text prompt into a clarity report")]
struct Cli {
    /// What is on your mind
    prompt: String,
    /// Base URL of a deployed clarity service (overrides CLARITY_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,
    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = ClarityConfig::load().context("failed to load configuration")?;
    if cli.base_url.is_some() {
        config.client.api_base_url = cli.base_url;
    }

    let generator = ClarityGenerator::from_settings(&config.gemini);
    let client = ReportClient::from_settings(&config.client, generator);
    let report = client.generate_report(&cli.prompt).await?;

    let json = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    Ok(json)
}
