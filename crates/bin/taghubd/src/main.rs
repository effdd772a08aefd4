//! # taghubd — taghub daemon
//!
//! Composition root that wires the Netatmo adapter into the entity registry
//! and keeps it refreshed.
//!
//! ## Responsibilities
//! - Parse configuration (config file path argument, env vars, config file)
//! - Initialize logging
//! - Construct the event bus and entity registry
//! - Set up the Netatmo integration against the registry
//! - Refresh on a fixed interval until Ctrl+C, then tear down
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use taghub_adapter_netatmo::NetatmoIntegration;
use taghub_app::event_bus::InProcessEventBus;
use taghub_app::ports::{EntityHost, Integration};
use taghub_app::registry::EntityRegistry;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_PATH.to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();
    tracing::info!(config = %config_path, "taghubd starting");

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let log_task = tokio::spawn(log_events(event_bus.subscribe()));

    // Entity registry
    let registry = EntityRegistry::new(Arc::clone(&event_bus));
    let host: Arc<dyn EntityHost> = Arc::new(registry.clone());

    if !config.netatmo.enabled {
        tracing::warn!("netatmo integration disabled, nothing to do");
        log_task.abort();
        return Ok(());
    }

    // Integration
    let mut netatmo = NetatmoIntegration::new(config.netatmo.clone());
    netatmo.setup(host).await?;

    run(&netatmo, config.scan_interval(), tokio::signal::ctrl_c()).await;

    tracing::info!("shutting down");
    netatmo.teardown().await?;
    registry.remove_all();
    log_task.abort();
    Ok(())
}

/// Refresh every `period` until `shutdown` resolves; returns how many
/// refreshes ran.
async fn run(
    netatmo: &NetatmoIntegration,
    period: Duration,
    shutdown: impl Future<Output = std::io::Result<()>>,
) -> usize {
    tokio::pin!(shutdown);
    let mut interval = tokio::time::interval(period);
    let mut refreshes = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                refresh(netatmo);
                refreshes += 1;
            }
            result = &mut shutdown => {
                if let Err(err) = result {
                    tracing::error!(error = %err, "failed to listen for shutdown signal");
                }
                break;
            }
        }
    }
    refreshes
}

fn refresh(netatmo: &NetatmoIntegration) {
    match netatmo.refresh() {
        Ok(summary) => tracing::debug!(
            discovered = summary.discovered,
            removed = summary.removed,
            notified = summary.notified,
            "netatmo refreshed"
        ),
        Err(err) => tracing::warn!(
            error = %err,
            source = ?std::error::Error::source(&err),
            "netatmo refresh failed"
        ),
    }
}

async fn log_events(mut receiver: broadcast::Receiver<taghub_domain::event::Event>) {
    loop {
        match receiver.recv().await {
            Ok(event) => tracing::info!(
                event_type = %event.event_type,
                unique_id = event.unique_id.as_deref().unwrap_or("-"),
                data = %event.data,
                "event"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
