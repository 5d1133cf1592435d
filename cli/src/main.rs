// Copyright (c) 2026 flowforge contributors
// SPDX-License-Identifier: MIT

//! # flowforge
//!
//! Synthesizes a Twilio Studio flow from the functions deployed to a
//! Serverless service and publishes it in a single pass:
//! resolve deployed functions -> synthesize the flow graph -> validate
//! against the Studio API -> create or update the hosted flow.
//!
//! ```text
//! flowforge ZSxxxxxxxx             # create a new flow
//! flowforge ZSxxxxxxxx FWyyyyyyyy  # update an existing flow
//! ```
//!
//! Credentials come from `TWILIO_API_KEY` / `TWILIO_API_SECRET` (a `.env`
//! file is honored). The trigger parameters are read from a JSON object
//! file before any remote call is made.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::info;

use flowforge_core::application::pipeline::{DeployPipeline, DeployRequest, PipelineError};
use flowforge_core::config::TwilioConfig;
use flowforge_core::domain::parameters::ParameterSet;
use flowforge_core::infrastructure::serverless_client::ServerlessClient;
use flowforge_core::infrastructure::studio_client::StudioClient;

/// Synthesize and publish a Studio flow wired to a service's functions
#[derive(Parser)]
#[command(name = "flowforge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Serverless service SID whose deployed functions are wired into the flow
    #[arg(value_name = "SERVICE_SID")]
    service_sid: String,

    /// Existing Studio flow SID to update (omit to create a new flow)
    #[arg(value_name = "FLOW_SID")]
    flow_sid: Option<String>,

    /// Path to the trigger parameters JSON file
    #[arg(short, long, value_name = "FILE", default_value = "parameters.json")]
    parameters: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FLOWFORGE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    // Pre-flight: credentials and parameters are loaded before any remote
    // call is attempted.
    let config = TwilioConfig::from_env()
        .map_err(PipelineError::from)
        .context("Failed to load Twilio configuration")?;
    let parameters = ParameterSet::from_file(&cli.parameters)
        .map_err(PipelineError::from)
        .with_context(|| format!("Failed to load trigger parameters from {}", cli.parameters.display()))?;

    info!(
        service_sid = %cli.service_sid,
        parameters = parameters.len(),
        updating = cli.flow_sid.is_some(),
        "starting flow deployment"
    );

    let studio = Arc::new(StudioClient::new(&config));
    let pipeline = DeployPipeline::new(
        Arc::new(ServerlessClient::new(&config)),
        studio.clone(),
        studio,
    );

    let request = DeployRequest {
        service_sid: cli.service_sid,
        flow_sid: cli.flow_sid,
        parameters,
    };

    match pipeline.run(&request).await {
        Ok(result) => {
            println!("{}", "✓ Flow published successfully!".green().bold());
            println!();
            println!("  Flow SID: {}", result.sid);
            println!("  Status:   {}", result.status);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", format!("✗ {err}").red());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
