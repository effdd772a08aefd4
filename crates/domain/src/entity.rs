//! Entity — the normalized view of one observable aspect of a device.
//!
//! Integrations describe their entities with an [`EntityMetadata`] value
//! (identity, display name, classification, owning device) and expose the
//! live state through the `BinarySensor` port in the `app` crate. The host
//! turns both into an [`EntitySnapshot`] whenever it reports the entity.

mod attribute_value;
mod state;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use attribute_value::AttributeValue;
pub use state::EntityState;

use crate::device::DeviceInfo;
use crate::error::{TaghubError, ValidationError};

/// Device class of a binary sensor; tells the host how to label on/off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarySensorDeviceClass {
    Battery,
    Connectivity,
    Door,
    GarageDoor,
    Motion,
    Occupancy,
    Opening,
    Problem,
    Smoke,
    Tamper,
    Window,
}

impl BinarySensorDeviceClass {
    /// The lowercase name the host renders.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::Connectivity => "connectivity",
            Self::Door => "door",
            Self::GarageDoor => "garage_door",
            Self::Motion => "motion",
            Self::Occupancy => "occupancy",
            Self::Opening => "opening",
            Self::Problem => "problem",
            Self::Smoke => "smoke",
            Self::Tamper => "tamper",
            Self::Window => "window",
        }
    }
}

impl std::fmt::Display for BinarySensorDeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary classification hiding an entity from the main dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

/// Static description of an entity, frozen when the integration creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Stable identifier, unique across all integrations.
    pub unique_id: String,
    /// Display name.
    pub name: String,
    pub device_class: Option<BinarySensorDeviceClass>,
    pub entity_category: Option<EntityCategory>,
    pub device: DeviceInfo,
}

impl EntityMetadata {
    /// Create a builder for constructing an [`EntityMetadata`].
    #[must_use]
    pub fn builder() -> EntityMetadataBuilder {
        EntityMetadataBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TaghubError::Validation`] when `unique_id` or `name` is empty.
    pub fn validate(&self) -> Result<(), TaghubError> {
        if self.unique_id.is_empty() {
            return Err(ValidationError::EmptyUniqueId.into());
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`EntityMetadata`].
#[derive(Debug, Default)]
pub struct EntityMetadataBuilder {
    unique_id: Option<String>,
    name: Option<String>,
    device_class: Option<BinarySensorDeviceClass>,
    entity_category: Option<EntityCategory>,
    device: Option<DeviceInfo>,
}

impl EntityMetadataBuilder {
    #[must_use]
    pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn device_class(mut self, device_class: BinarySensorDeviceClass) -> Self {
        self.device_class = Some(device_class);
        self
    }

    #[must_use]
    pub fn entity_category(mut self, category: Option<EntityCategory>) -> Self {
        self.entity_category = category;
        self
    }

    #[must_use]
    pub fn device(mut self, device: DeviceInfo) -> Self {
        self.device = Some(device);
        self
    }

    /// Consume the builder, validate, and return an [`EntityMetadata`].
    ///
    /// # Errors
    ///
    /// Returns [`TaghubError::Validation`] if `unique_id`, `name` or the
    /// device description is missing or empty.
    pub fn build(self) -> Result<EntityMetadata, TaghubError> {
        let device = match self.device {
            Some(device) => device,
            None => DeviceInfo::builder().build()?,
        };
        let metadata = EntityMetadata {
            unique_id: self.unique_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            device_class: self.device_class,
            entity_category: self.entity_category,
            device,
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

/// Point-in-time rendering of an entity, as handed to event subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub unique_id: String,
    pub name: String,
    pub state: EntityState,
    pub device_class: Option<BinarySensorDeviceClass>,
    pub entity_category: Option<EntityCategory>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl EntitySnapshot {
    /// Build a snapshot from metadata and a rendered state.
    ///
    /// Device fields the host displays (model, room, configuration page) are
    /// copied into the attribute map.
    #[must_use]
    pub fn new(metadata: &EntityMetadata, state: EntityState) -> Self {
        let mut attributes = BTreeMap::new();
        let device = &metadata.device;
        if let Some(model) = &device.model {
            attributes.insert("model".to_string(), AttributeValue::from(model.as_str()));
        }
        if let Some(area) = &device.suggested_area {
            attributes.insert("room_id".to_string(), AttributeValue::from(area.as_str()));
        }
        if let Some(url) = &device.configuration_url {
            attributes.insert(
                "configuration_url".to_string(),
                AttributeValue::from(url.as_str()),
            );
        }
        Self {
            unique_id: metadata.unique_id.clone(),
            name: metadata.name.clone(),
            state,
            device_class: metadata.device_class,
            entity_category: metadata.entity_category,
            attributes,
        }
    }
}
