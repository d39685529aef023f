//! Background thread that owns the metadata service.
//!
//! The service (and with it the lookup cache) lives on exactly one thread;
//! the UI only exchanges messages with it, so lookups run one at a time.

use std::{sync::mpsc as std_mpsc, thread};

use anyhow::{Context, Result};
use gamelog_core::{AppConfig, Lookup, MetadataService};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::app::AppEvent;

/// Work the UI can ask for.
#[derive(Debug)]
pub enum WorkerRequest {
    Lookup {
        subject: String,
        platform: Option<String>,
    },
    ClearCache,
}

/// Replies sent back to the UI.
#[derive(Debug)]
pub enum WorkerEvent {
    /// Service constructed; `online` reports the connectivity probe.
    Ready {
        provider: Option<String>,
        online: bool,
        cached: usize,
    },
    LookupFinished {
        subject: String,
        platform: Option<String>,
        lookup: Lookup,
        cached: usize,
    },
    CacheCleared,
}

/// Start the worker thread and return the request channel.
pub fn spawn(
    config: AppConfig,
    events: mpsc::Sender<AppEvent>,
) -> Result<std_mpsc::Sender<WorkerRequest>> {
    let (request_tx, request_rx) = std_mpsc::channel::<WorkerRequest>();
    thread::Builder::new()
        .name("gamelog-worker".to_string())
        .spawn(move || run(config, request_rx, events))
        .context("failed to spawn lookup worker")?;
    Ok(request_tx)
}

fn run(
    config: AppConfig,
    requests: std_mpsc::Receiver<WorkerRequest>,
    events: mpsc::Sender<AppEvent>,
) {
    let mut service = MetadataService::from_config(&config);
    let provider = service.provider_name().map(str::to_string);
    let online = provider.is_some() && service.probe();
    info!(
        cache = %service.cache().path().display(),
        entries = service.cache().len(),
        ?provider,
        online,
        "lookup worker ready"
    );
    let ready = WorkerEvent::Ready {
        provider,
        online,
        cached: service.cache().len(),
    };
    if events.blocking_send(AppEvent::Worker(ready)).is_err() {
        return;
    }

    while let Ok(request) = requests.recv() {
        let event = match request {
            WorkerRequest::Lookup { subject, platform } => {
                let lookup = service.lookup(&subject, platform.as_deref());
                WorkerEvent::LookupFinished {
                    subject,
                    platform,
                    lookup,
                    cached: service.cache().len(),
                }
            }
            WorkerRequest::ClearCache => {
                service.clear_cache();
                WorkerEvent::CacheCleared
            }
        };
        if events.blocking_send(AppEvent::Worker(event)).is_err() {
            break;
        }
    }
    debug!("lookup worker stopped");
}
