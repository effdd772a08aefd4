//! Where home status documents come from.
//!
//! Talking to the vendor cloud is the vendor client's job; the data handler
//! only needs something that hands it the latest document.

use std::path::PathBuf;

use crate::error::NetatmoError;
use crate::module::HomeStatus;

/// Supplier of home status documents.
pub trait HomeStatusSource: Send + Sync {
    /// Fetch the latest document.
    ///
    /// # Errors
    ///
    /// Returns a [`NetatmoError`] if the document cannot be obtained or parsed.
    fn fetch(&self) -> Result<HomeStatus, NetatmoError>;
}

/// Reads the document from a JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct FileHomeStatusSource {
    path: PathBuf,
}

impl FileHomeStatusSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HomeStatusSource for FileHomeStatusSource {
    fn fetch(&self) -> Result<HomeStatus, NetatmoError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| NetatmoError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
