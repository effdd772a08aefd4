//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`TaghubError`]
//! via `#[from]` (or an explicit `into_domain`) when crossing a port boundary.

/// Base error returned by domain builders and application ports.
#[derive(Debug, thiserror::Error)]
pub enum TaghubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An adapter-level failure (IO, parsing, …) surfaced through a port.
    #[error("integration error")]
    Integration(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unique id must not be empty")]
    EmptyUniqueId,

    #[error("name must not be empty")]
    EmptyName,

    #[error("unique id {0} is already registered")]
    DuplicateUniqueId(String),
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of record that was looked up (e.g. `"Entity"`).
    pub entity: &'static str,
    /// The identifier that was not found.
    pub id: String,
}
