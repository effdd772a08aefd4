//! Device — the physical accessory that exposes one or more entities.

use serde::{Deserialize, Serialize};

use crate::error::{TaghubError, ValidationError};

/// Description of the physical accessory behind an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Vendor identifier of the accessory (e.g. a module MAC address).
    pub identifier: String,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    /// Vendor web page where the accessory can be configured.
    pub configuration_url: Option<String>,
    /// Room the vendor places the accessory in.
    pub suggested_area: Option<String>,
    /// Identifier of the parent (home, hub, bridge) the accessory talks through.
    pub via_device: Option<String>,
}

impl DeviceInfo {
    /// Create a builder for constructing a [`DeviceInfo`].
    #[must_use]
    pub fn builder() -> DeviceInfoBuilder {
        DeviceInfoBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TaghubError::Validation`] when `identifier` or `name` is empty.
    pub fn validate(&self) -> Result<(), TaghubError> {
        if self.identifier.is_empty() {
            return Err(ValidationError::EmptyUniqueId.into());
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`DeviceInfo`].
#[derive(Debug, Default)]
pub struct DeviceInfoBuilder {
    identifier: Option<String>,
    name: Option<String>,
    manufacturer: Option<String>,
    model: Option<String>,
    configuration_url: Option<String>,
    suggested_area: Option<String>,
    via_device: Option<String>,
}

impl DeviceInfoBuilder {
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn configuration_url(mut self, url: impl Into<String>) -> Self {
        self.configuration_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn suggested_area(mut self, area: Option<String>) -> Self {
        self.suggested_area = area;
        self
    }

    #[must_use]
    pub fn via_device(mut self, parent: impl Into<String>) -> Self {
        self.via_device = Some(parent.into());
        self
    }

    /// Consume the builder, validate, and return a [`DeviceInfo`].
    ///
    /// # Errors
    ///
    /// Returns [`TaghubError::Validation`] if `identifier` or `name` is missing.
    pub fn build(self) -> Result<DeviceInfo, TaghubError> {
        let device = DeviceInfo {
            identifier: self.identifier.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            manufacturer: self.manufacturer,
            model: self.model,
            configuration_url: self.configuration_url,
            suggested_area: self.suggested_area,
            via_device: self.via_device,
        };
        device.validate()?;
        Ok(device)
    }
}
