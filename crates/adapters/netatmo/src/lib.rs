//! # taghub-adapter-netatmo
//!
//! Netatmo security adapter — exposes the door tags paired with a Netatmo
//! camera as opening binary sensors.
//!
//! ## How it works
//!
//! The [`DataHandler`] reads home status documents from a
//! [`HomeStatusSource`]. Every door tag it sees for the first time is
//! announced on [`NETATMO_CREATE_DOORTAG_SENSOR`]; the binary sensor
//! platform, connected during [`Integration::setup`], turns the announcement
//! into a [`DoorTagBinarySensor`] and hands it to the host. Door tags seen
//! before setup are announced once the platform is connected. Later
//! documents update the door tags in place and push one update to every
//! entity of the refreshed home; a door tag missing from its home is
//! announced on [`NETATMO_REMOVE_DOORTAG_SENSOR`] and leaves the host.
//!
//! | Field | Host property |
//! |-------|---------------|
//! | `status == "open"` | `is_on` |
//! | `reachable` | `available` |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `taghub-app` and `taghub-domain`.

pub mod binary_sensor;
mod config;
pub mod constants;
pub mod data_handler;
mod entity_base;
mod error;
pub mod module;
mod source;

pub use binary_sensor::{DoorTagBinarySensor, DoorTagDescription};
pub use config::NetatmoConfig;
pub use constants::{NETATMO_CREATE_DOORTAG_SENSOR, NETATMO_REMOVE_DOORTAG_SENSOR};
pub use data_handler::{DataHandler, NetatmoDevice, RefreshSummary};
pub use error::NetatmoError;
pub use source::{FileHomeStatusSource, HomeStatusSource};

use std::sync::Arc;

use taghub_app::dispatcher::{Dispatcher, Subscription};
use taghub_app::ports::{EntityHost, Integration};
use taghub_domain::error::TaghubError;

/// Netatmo integration: one data handler plus the door tag platform.
pub struct NetatmoIntegration {
    config: NetatmoConfig,
    source: Box<dyn HomeStatusSource>,
    dispatcher: Dispatcher<NetatmoDevice>,
    data_handler: Arc<DataHandler>,
    host: Option<Arc<dyn EntityHost>>,
    /// Platform subscriptions; dropping them disconnects the platforms.
    unload_callbacks: Vec<Subscription>,
}

impl NetatmoIntegration {
    /// Create an integration reading `config.home_status_path`.
    #[must_use]
    pub fn new(config: NetatmoConfig) -> Self {
        let source = FileHomeStatusSource::new(config.home_status_path.clone());
        Self::with_source(config, Box::new(source))
    }

    /// Create an integration reading documents from `source`.
    #[must_use]
    pub fn with_source(config: NetatmoConfig, source: Box<dyn HomeStatusSource>) -> Self {
        let dispatcher = Dispatcher::new();
        let data_handler = Arc::new(DataHandler::new(dispatcher.clone()));
        Self {
            config,
            source,
            dispatcher,
            data_handler,
            host: None,
            unload_callbacks: Vec::new(),
        }
    }

    #[must_use]
    pub fn data_handler(&self) -> &Arc<DataHandler> {
        &self.data_handler
    }

    /// Whether [`setup`](Integration::setup) ran and no teardown followed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.host.is_some()
    }

    /// Pull the latest document and apply it.
    ///
    /// # Errors
    ///
    /// Returns a [`NetatmoError`] if the source cannot deliver a document.
    pub fn refresh(&self) -> Result<RefreshSummary, NetatmoError> {
        self.data_handler.refresh(self.source.as_ref(), &self.config)
    }
}

impl Integration for NetatmoIntegration {
    fn name(&self) -> &'static str {
        constants::DOMAIN
    }

    async fn setup(&mut self, host: Arc<dyn EntityHost>) -> Result<(), TaghubError> {
        if self.is_loaded() {
            tracing::debug!("netatmo integration already set up");
            return Ok(());
        }

        self.unload_callbacks.extend(binary_sensor::setup_entry(
            &self.dispatcher,
            Arc::clone(&host),
            DoorTagDescription::default(),
        ));
        self.host = Some(host);
        let announced = self.data_handler.announce_pending();

        tracing::info!(
            home_ids = ?self.config.home_ids,
            scan_interval_secs = self.config.scan_interval_secs,
            announced,
            "netatmo integration set up"
        );
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), TaghubError> {
        self.unload_callbacks.clear();

        if let Some(host) = self.host.take() {
            let ids = self.data_handler.subscriber_ids();
            let count = ids.len();
            for unique_id in ids {
                host.remove_entity(&unique_id);
            }
            tracing::info!(removed = count, "netatmo integration unloaded");
        }
        self.data_handler.clear();
        Ok(())
    }
}
