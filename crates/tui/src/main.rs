mod app;
mod worker;

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};

use gamelog_core::config::{self, AppConfig};
use tokio::sync::mpsc;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_file = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    tracing::info!(
        config = %config_file.display(),
        cache = %config.cache_path.display(),
        model = %config.model,
        "starting gamelog"
    );

    let (event_tx, event_rx) = mpsc::channel(128);
    let worker = worker::spawn(config, event_tx.clone())?;

    let mut app = app::GamelogApp::new(worker);
    app.run(event_rx, event_tx).await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("gamelog.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the UI, so only the file receives events.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
