//! Integration port — lifecycle of a vendor integration.
//!
//! An integration bridges a vendor ecosystem into the taghub host. On setup
//! it connects its platforms to the discovery signals they handle; entities
//! are then created as the vendor data handler discovers accessories.

use std::future::Future;
use std::sync::Arc;

use taghub_domain::error::TaghubError;

use super::EntityHost;

/// A pluggable vendor integration.
///
/// The binary crate calls the lifecycle methods in order:
///
/// 1. [`setup`](Self::setup): connect platform listeners to the host
/// 2. (the daemon runs; the vendor data handler discovers and updates devices)
/// 3. [`teardown`](Self::teardown): disconnect listeners and drop entities
pub trait Integration {
    /// Unique name identifying this integration (e.g. `"netatmo"`).
    fn name(&self) -> &'static str;

    /// Subscribe platform listeners; entities they build go to `host`.
    fn setup(
        &mut self,
        host: Arc<dyn EntityHost>,
    ) -> impl Future<Output = Result<(), TaghubError>> + Send;

    /// Called on unload. Disconnects every subscription made in
    /// [`setup`](Self::setup) and removes the integration's entities.
    fn teardown(&mut self) -> impl Future<Output = Result<(), TaghubError>> + Send;
}
