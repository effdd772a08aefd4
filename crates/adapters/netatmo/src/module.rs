//! Vendor model of the home status document and of door tag modules.
//!
//! The document mirrors what the Netatmo home status endpoint returns, reduced
//! to the fields the adapter reads:
//!
//! ```json
//! {"homes": [{"id": "5c810cb1e1a2c", "name": "Home", "modules": [
//!     {"id": "70:ee:50:00:00:01", "type": "NACamDoorTag", "name": "Front Door",
//!      "room_id": "2255031728", "status": "open", "reachable": true}
//! ]}]}
//! ```

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;

use crate::constants::OPEN_STATUS;

/// Kind of module reported in a home.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ModuleType {
    /// Door/window contact tag paired with an indoor camera.
    NACamDoorTag,
    /// Indoor camera.
    NACamera,
    /// Outdoor camera.
    NOC,
    /// Indoor siren.
    NIS,
    /// Smoke detector.
    NSD,
    /// Carbon monoxide detector.
    NCO,
    /// Any module type this adapter does not know about.
    Other(String),
}

impl ModuleType {
    /// Vendor model identifier, as found in the `type` field.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NACamDoorTag => "NACamDoorTag",
            Self::NACamera => "NACamera",
            Self::NOC => "NOC",
            Self::NIS => "NIS",
            Self::NSD => "NSD",
            Self::NCO => "NCO",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for ModuleType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "NACamDoorTag" => Self::NACamDoorTag,
            "NACamera" => Self::NACamera,
            "NOC" => Self::NOC,
            "NIS" => Self::NIS,
            "NSD" => Self::NSD,
            "NCO" => Self::NCO,
            _ => Self::Other(value),
        }
    }
}

impl std::fmt::Display for ModuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole home status document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomeStatus {
    #[serde(default)]
    pub homes: Vec<HomeDocument>,
}

/// One home and the modules it reports.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeDocument {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleDocument>,
}

/// One module entry of a home.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reachable: Option<bool>,
}

/// Live state of one door tag, kept up to date by the data handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorTag {
    /// Stable module identifier (MAC address).
    pub entity_id: String,
    pub name: String,
    pub room_id: Option<String>,
    pub device_type: ModuleType,
    /// Raw contact status (`"open"`, `"closed"`, `"no_news"`, …).
    pub status: Option<String>,
    pub reachable: Option<bool>,
    /// Identifier of the home the tag belongs to.
    pub home_id: String,
}

impl DoorTag {
    /// Build a door tag from its module entry.
    #[must_use]
    pub fn from_document(home_id: &str, doc: &ModuleDocument) -> Self {
        Self {
            entity_id: doc.id.clone(),
            name: doc.name.clone().unwrap_or_else(|| doc.id.clone()),
            room_id: doc.room_id.clone(),
            device_type: doc.module_type.clone(),
            status: doc.status.clone(),
            reachable: doc.reachable,
            home_id: home_id.to_string(),
        }
    }

    /// Overwrite the live fields with a newer module entry.
    pub fn apply(&mut self, doc: &ModuleDocument) {
        if let Some(name) = &doc.name {
            self.name.clone_from(name);
        }
        self.room_id.clone_from(&doc.room_id);
        self.status.clone_from(&doc.status);
        self.reachable = doc.reachable;
    }

    /// Whether the contact currently reports open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status.as_deref() == Some(OPEN_STATUS)
    }

    /// Whether the tag currently answers; a missing flag counts as unreachable.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.reachable.unwrap_or(false)
    }
}

/// Door tag shared between the data handler (writer) and its entity (reader).
#[derive(Debug, Clone)]
pub struct SharedDoorTag(Arc<RwLock<DoorTag>>);

impl SharedDoorTag {
    #[must_use]
    pub fn new(tag: DoorTag) -> Self {
        Self(Arc::new(RwLock::new(tag)))
    }

    /// Read access to the live fields.
    #[must_use]
    pub fn read(&self) -> RwLockReadGuard<'_, DoorTag> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access; only the data handler mutates a tag.
    #[must_use]
    pub fn write(&self) -> RwLockWriteGuard<'_, DoorTag> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}
