//! Netatmo adapter error types.

use std::path::PathBuf;

use taghub_domain::error::TaghubError;

/// Errors specific to the Netatmo adapter.
#[derive(Debug, thiserror::Error)]
pub enum NetatmoError {
    /// The home status snapshot could not be read.
    #[error("failed to read home status from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The home status snapshot is not valid JSON for the expected schema.
    #[error("failed to parse home status")]
    Parse(#[from] serde_json::Error),

    /// A configured home is missing from the home status document.
    #[error("home {0} not found in home status")]
    UnknownHome(String),

    /// A domain-level error (validation, not-found, etc.).
    #[error("domain error")]
    Domain(#[source] TaghubError),
}

impl NetatmoError {
    /// Convert into a [`TaghubError::Integration`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> TaghubError {
        match self {
            Self::Domain(err) => err,
            other => TaghubError::Integration(Box::new(other)),
        }
    }
}

impl From<NetatmoError> for TaghubError {
    fn from(err: NetatmoError) -> Self {
        err.into_domain()
    }
}
