//! Bookkeeping shared by every Netatmo entity.
//!
//! Holds the data handler and the publisher groups the entity listens to,
//! and builds the [`DeviceInfo`] of a module.

use std::sync::Arc;

use taghub_app::ports::{Publisher, UpdateHandle};
use taghub_domain::device::DeviceInfo;
use taghub_domain::error::TaghubError;

use crate::constants::{DOMAIN, MANUFACTURER};
use crate::data_handler::DataHandler;
use crate::module::DoorTag;

pub struct NetatmoBase {
    data_handler: Arc<DataHandler>,
    publishers: Vec<Publisher>,
    /// `unique_id` the entity subscribed with, once added to the host.
    subscribed_as: Option<String>,
}

impl NetatmoBase {
    #[must_use]
    pub fn new(data_handler: Arc<DataHandler>, publishers: Vec<Publisher>) -> Self {
        Self {
            data_handler,
            publishers,
            subscribed_as: None,
        }
    }

    #[must_use]
    pub fn publishers(&self) -> &[Publisher] {
        &self.publishers
    }

    /// Join every publisher group with `handle`.
    pub fn subscribe(&mut self, handle: &UpdateHandle) {
        for publisher in &self.publishers {
            self.data_handler.subscribe(publisher.clone(), handle.clone());
        }
        self.subscribed_as = Some(handle.unique_id().to_string());
    }

    /// Leave every publisher group joined by [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&mut self) {
        if let Some(unique_id) = self.subscribed_as.take() {
            for publisher in &self.publishers {
                self.data_handler
                    .unsubscribe(&publisher.signal_name, &unique_id);
            }
        }
    }
}

impl std::fmt::Debug for NetatmoBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetatmoBase")
            .field("publishers", &self.publishers)
            .field("subscribed_as", &self.subscribed_as)
            .finish_non_exhaustive()
    }
}

/// Device description of a module, attached to every entity it exposes.
///
/// # Errors
///
/// Returns [`TaghubError::Validation`] when the module has no id or name.
pub fn module_device_info(
    tag: &DoorTag,
    configuration_url: &str,
) -> Result<DeviceInfo, TaghubError> {
    let identifier = if tag.entity_id.is_empty() {
        String::new()
    } else {
        format!("{DOMAIN}-{}", tag.entity_id)
    };
    DeviceInfo::builder()
        .identifier(identifier)
        .name(tag.name.as_str())
        .manufacturer(MANUFACTURER)
        .model(tag.device_type.as_str())
        .configuration_url(configuration_url)
        .suggested_area(tag.room_id.clone())
        .via_device(format!("{DOMAIN}-{}", tag.home_id))
        .build()
}
