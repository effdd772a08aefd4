//! Entity ports — how integrations hand entities to the host, and how the
//! host drives them afterwards.

use std::fmt;
use std::sync::Arc;

use taghub_domain::entity::{EntityMetadata, EntitySnapshot, EntityState};

/// Publisher group an entity listens to.
///
/// A data handler refreshes one group at a time (e.g. every module of one
/// home) and pushes a single update to each subscriber of that group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Publisher {
    /// Kind of data the group carries (e.g. `"home"`).
    pub name: String,
    /// Identifier of the parent the group is keyed by.
    pub home_id: String,
    /// Signal the data handler fires for this group.
    pub signal_name: String,
}

/// Callback asking the host to resynchronize one entity.
///
/// Cheap to clone; firing it runs the entity's
/// [`update_callback`](BinarySensor::update_callback) through the host.
#[derive(Clone)]
pub struct UpdateHandle {
    unique_id: String,
    callback: Arc<dyn Fn(&str) + Send + Sync>,
}

impl UpdateHandle {
    /// Wrap a host callback for the entity identified by `unique_id`.
    pub fn new(
        unique_id: impl Into<String>,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            callback: Arc::new(callback),
        }
    }

    /// The entity this handle updates.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Ask the host to run the entity's push-update handler.
    pub fn fire(&self) {
        (self.callback)(&self.unique_id);
    }
}

impl fmt::Debug for UpdateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateHandle")
            .field("unique_id", &self.unique_id)
            .finish_non_exhaustive()
    }
}

/// A binary (on/off) entity owned by the host and driven by push updates.
///
/// Implementors only translate their source; the host decides when to call
/// [`update_callback`](Self::update_callback) and serialises those calls per
/// entity.
pub trait BinarySensor: Send {
    /// Identity and classification, frozen at construction.
    fn metadata(&self) -> &EntityMetadata;

    /// Whether the sensor reads "on", evaluated from the source on each call.
    fn is_on(&self) -> bool;

    /// Whether the source is currently reachable.
    fn available(&self) -> bool;

    /// Value cached by the last push update (`None` when unknown).
    fn native_value(&self) -> Option<bool>;

    /// Publisher groups this entity subscribes to.
    fn publishers(&self) -> &[Publisher];

    /// Resynchronize cached fields from the source. The only mutation path.
    fn update_callback(&mut self);

    /// Called once the host stored the entity; `handle` triggers its updates.
    fn added_to_host(&mut self, _handle: UpdateHandle) {}

    /// Called when the host drops the entity.
    fn will_remove_from_host(&mut self) {}

    /// State as rendered by the host.
    fn state(&self) -> EntityState {
        EntityState::from_binary(self.available(), self.native_value())
    }

    /// Snapshot for event subscribers.
    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::new(self.metadata(), self.state())
    }
}

/// The host's entity collection, as seen by integration platforms.
pub trait EntityHost: Send + Sync {
    /// Register freshly constructed entities.
    fn add_entities(&self, entities: Vec<Box<dyn BinarySensor>>);

    /// Drop an entity; returns `false` when it was not registered.
    fn remove_entity(&self, unique_id: &str) -> bool;
}

impl<T: EntityHost + ?Sized> EntityHost for Arc<T> {
    fn add_entities(&self, entities: Vec<Box<dyn BinarySensor>>) {
        (**self).add_entities(entities);
    }

    fn remove_entity(&self, unique_id: &str) -> bool {
        (**self).remove_entity(unique_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn should_pass_unique_id_to_callback_when_fired() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = UpdateHandle::new("home-tag-doortag", move |id| {
            sink.lock().unwrap().push(id.to_string());
        });

        handle.fire();
        handle.clone().fire();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["home-tag-doortag".to_string(), "home-tag-doortag".to_string()]
        );
    }

    #[test]
    fn should_debug_print_unique_id_only() {
        let handle = UpdateHandle::new("abc", |_| {});
        let text = format!("{handle:?}");
        assert!(text.contains("abc"));
    }
}
