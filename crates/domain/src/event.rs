//! Event — an immutable record of something that happened to an entity.

use serde::{Deserialize, Serialize};

use crate::id::EventId;
use crate::time::{Timestamp, now};

/// What kind of thing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EntityCreated,
    StateChanged,
    EntityRemoved,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntityCreated => f.write_str("entity_created"),
            Self::StateChanged => f.write_str("state_changed"),
            Self::EntityRemoved => f.write_str("entity_removed"),
        }
    }
}

/// A single event published on the host's event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    /// `unique_id` of the entity the event is about, if any.
    pub unique_id: Option<String>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(event_type: EventType, unique_id: Option<String>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            unique_id,
            data,
            timestamp: now(),
        }
    }
}
