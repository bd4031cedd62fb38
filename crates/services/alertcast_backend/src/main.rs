// File: services/alertcast_backend/src/main.rs
//
// Reads a JSON array of alerts from the file given as first argument, or
// from stdin, dispatches it and prints one JSON channel response per line.

use alertcast_backend::{dispatch_batch, write_metrics, AppState};
use alertcast_common::{config_error, logging, Alert, AlertcastError, Context};
use alertcast_config::load_config;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

async fn read_input(path: Option<String>) -> Result<String, AlertcastError> {
    match path {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {path}")),
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("reading stdin")?;
            Ok(input)
        }
    }
}

async fn run() -> Result<(), AlertcastError> {
    let config = Arc::new(load_config().map_err(config_error)?);
    let state = AppState::build(config).await?;

    let input = read_input(std::env::args().nth(1)).await?;
    let alerts: Vec<Alert> = serde_json::from_str(&input)?;
    let responses = dispatch_batch(&state, alerts).await?;

    let mut out = std::io::stdout().lock();
    for response in &responses {
        writeln!(out, "{}", serde_json::to_string(response)?)?;
    }

    if let Some(path) = state.config.metrics_path.as_deref() {
        write_metrics(&state, path).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::log_error(&e, "alertcast failed");
            ExitCode::FAILURE
        }
    }
}
