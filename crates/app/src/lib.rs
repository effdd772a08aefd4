//! # taghub-app
//!
//! Application layer — host infrastructure and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement or call:
//!   - `BinarySensor` — the interface every binary sensor entity implements
//!   - `EntityHost` — the host's entity collection, used by platforms to add entities
//!   - `EventPublisher` — publish domain events
//!   - `Integration` — lifecycle of a vendor integration
//! - Provide **in-process infrastructure** that doesn't need IO:
//!   - `Dispatcher` — named broadcast signals with auto-disconnecting subscriptions
//!   - `EntityRegistry` — owns entities, runs push updates, emits state changes
//!   - `InProcessEventBus` — tokio broadcast event bus
//!
//! ## Dependency rule
//! Depends on `taghub-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod dispatcher;
pub mod event_bus;
pub mod ports;
pub mod registry;
