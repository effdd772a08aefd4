//! # taghub-domain
//!
//! Pure domain model for the taghub home automation host.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Entity metadata** (identity, display name, device class, category)
//! - Define **Entity state** (on/off/unknown/unavailable) and the rule that an
//!   unavailable entity never renders a stale reading
//! - Define **Device info** (the physical accessory an entity belongs to)
//! - Define **Events** (entity created, state changed, entity removed)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod entity;
pub mod event;
