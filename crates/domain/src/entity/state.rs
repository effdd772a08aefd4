//! Entity state — the rendered operational state of an entity.

use serde::{Deserialize, Serialize};

/// Discrete operational state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    On,
    Off,
    #[default]
    Unknown,
    Unavailable,
}

impl EntityState {
    /// Render a binary sensor from its availability and cached value.
    ///
    /// An unavailable sensor is always [`Unavailable`](Self::Unavailable),
    /// whatever value was cached before it went away.
    #[must_use]
    pub fn from_binary(available: bool, value: Option<bool>) -> Self {
        match (available, value) {
            (false, _) => Self::Unavailable,
            (true, None) => Self::Unknown,
            (true, Some(true)) => Self::On,
            (true, Some(false)) => Self::Off,
        }
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Unknown => f.write_str("unknown"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}
