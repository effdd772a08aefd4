//! Entity registry — the host's collection of live entities.
//!
//! Platforms hand freshly built entities to the registry through
//! [`EntityHost`]. The registry owns them from then on: it runs their push
//! updates when a data handler fires their [`UpdateHandle`], renders their
//! state, and publishes an event only when the rendered state changed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use taghub_domain::entity::{EntitySnapshot, EntityState};
use taghub_domain::error::{NotFoundError, TaghubError, ValidationError};
use taghub_domain::event::{Event, EventType};

use crate::ports::{BinarySensor, EntityHost, EventPublisher, UpdateHandle};

struct TrackedEntity {
    sensor: Box<dyn BinarySensor>,
    /// Last state reported to subscribers.
    state: EntityState,
}

type SharedEntity = Arc<Mutex<TrackedEntity>>;

struct Inner<EP> {
    entities: Mutex<HashMap<String, SharedEntity>>,
    publisher: EP,
}

/// In-memory entity collection backed by an [`EventPublisher`].
///
/// Cheap to clone; every clone sees the same entities. Each entity sits
/// behind its own mutex, so at most one update runs per entity at a time
/// while different entities never block each other.
pub struct EntityRegistry<EP> {
    inner: Arc<Inner<EP>>,
}

impl<EP> Clone for EntityRegistry<EP> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<EP> EntityRegistry<EP>
where
    EP: EventPublisher + Send + Sync + 'static,
{
    /// Create an empty registry publishing through `publisher`.
    pub fn new(publisher: EP) -> Self {
        Self {
            inner: Arc::new(Inner {
                entities: Mutex::new(HashMap::new()),
                publisher,
            }),
        }
    }

    /// Register one entity.
    ///
    /// Wires the entity's update handle, runs its first update and publishes
    /// [`EventType::EntityCreated`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateUniqueId`] if an entity with the
    /// same `unique_id` is already registered; the new entity is dropped.
    pub fn add_entity(&self, sensor: Box<dyn BinarySensor>) -> Result<(), TaghubError> {
        let unique_id = sensor.metadata().unique_id.clone();
        let entity = Arc::new(Mutex::new(TrackedEntity {
            state: sensor.state(),
            sensor,
        }));

        {
            let mut entities = self.lock_entities();
            if entities.contains_key(&unique_id) {
                return Err(ValidationError::DuplicateUniqueId(unique_id).into());
            }
            entities.insert(unique_id.clone(), Arc::clone(&entity));
        }

        let snapshot = {
            let mut tracked = lock_entity(&entity);
            tracked.sensor.added_to_host(self.update_handle(&unique_id));
            tracked.sensor.update_callback();
            tracked.state = tracked.sensor.state();
            tracked.sensor.snapshot()
        };

        tracing::info!(%unique_id, state = %snapshot.state, "entity added");
        self.publish(Event::new(
            EventType::EntityCreated,
            Some(unique_id),
            snapshot_json(&snapshot),
        ));
        Ok(())
    }

    /// Run the push-update handler of one entity.
    ///
    /// Returns `true` when the rendered state changed, in which case a
    /// [`EventType::StateChanged`] event carrying `from`/`to` was published.
    ///
    /// # Errors
    ///
    /// Returns [`TaghubError::NotFound`] if no entity has this `unique_id`.
    pub fn dispatch_update(&self, unique_id: &str) -> Result<bool, TaghubError> {
        let entity = self.lookup(unique_id)?;

        let change = {
            let mut tracked = lock_entity(&entity);
            tracked.sensor.update_callback();
            let new_state = tracked.sensor.state();
            let old_state = std::mem::replace(&mut tracked.state, new_state);
            (old_state != new_state).then(|| (old_state, tracked.sensor.snapshot()))
        };

        let Some((old_state, snapshot)) = change else {
            tracing::trace!(%unique_id, "update left state unchanged");
            return Ok(false);
        };

        tracing::info!(%unique_id, from = %old_state, to = %snapshot.state, "state changed");
        self.publish(Event::new(
            EventType::StateChanged,
            Some(unique_id.to_string()),
            serde_json::json!({
                "from": old_state,
                "to": snapshot.state,
                "entity": snapshot_json(&snapshot),
            }),
        ));
        Ok(true)
    }

    /// Snapshot of one entity as last rendered.
    #[must_use]
    pub fn get(&self, unique_id: &str) -> Option<EntitySnapshot> {
        let entity = self.lookup(unique_id).ok()?;
        let tracked = lock_entity(&entity);
        Some(tracked.sensor.snapshot())
    }

    /// Snapshots of every entity, sorted by `unique_id`.
    #[must_use]
    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        let entities: Vec<SharedEntity> = self.lock_entities().values().cloned().collect();
        let mut snapshots: Vec<EntitySnapshot> = entities
            .iter()
            .map(|entity| lock_entity(entity).sensor.snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        snapshots
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_entities().len()
    }

    /// Whether no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_entities().is_empty()
    }

    /// Remove every entity (host shutdown).
    pub fn remove_all(&self) {
        let ids: Vec<String> = self.lock_entities().keys().cloned().collect();
        for unique_id in ids {
            self.remove(&unique_id);
        }
    }

    fn remove(&self, unique_id: &str) -> bool {
        let Some(entity) = self.lock_entities().remove(unique_id) else {
            return false;
        };
        lock_entity(&entity).sensor.will_remove_from_host();
        tracing::info!(%unique_id, "entity removed");
        self.publish(Event::new(
            EventType::EntityRemoved,
            Some(unique_id.to_string()),
            serde_json::Value::Null,
        ));
        true
    }

    fn update_handle(&self, unique_id: &str) -> UpdateHandle {
        let weak: Weak<Inner<EP>> = Arc::downgrade(&self.inner);
        UpdateHandle::new(unique_id, move |id| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(err) = (Self { inner }).dispatch_update(id) {
                tracing::debug!(unique_id = %id, error = %err, "dropped update for unknown entity");
            }
        })
    }

    fn lookup(&self, unique_id: &str) -> Result<SharedEntity, TaghubError> {
        self.lock_entities()
            .get(unique_id)
            .cloned()
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Entity",
                    id: unique_id.to_string(),
                }
                .into()
            })
    }

    fn publish(&self, event: Event) {
        let event_type = event.event_type;
        if let Err(err) = self.inner.publisher.publish(event) {
            tracing::warn!(%event_type, error = %err, "failed to publish event");
        }
    }

    fn lock_entities(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedEntity>> {
        self.inner
            .entities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<EP> EntityHost for EntityRegistry<EP>
where
    EP: EventPublisher + Send + Sync + 'static,
{
    fn add_entities(&self, entities: Vec<Box<dyn BinarySensor>>) {
        for sensor in entities {
            if let Err(err) = self.add_entity(sensor) {
                tracing::warn!(error = %err, "entity rejected");
            }
        }
    }

    fn remove_entity(&self, unique_id: &str) -> bool {
        self.remove(unique_id)
    }
}

fn lock_entity(entity: &SharedEntity) -> std::sync::MutexGuard<'_, TrackedEntity> {
    entity.lock().unwrap_or_else(PoisonError::into_inner)
}

fn snapshot_json(snapshot: &EntitySnapshot) -> serde_json::Value {
    serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use taghub_domain::device::DeviceInfo;
    use taghub_domain::entity::EntityMetadata;

    use super::*;
    use crate::ports::Publisher;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingPublisher {
        fn types(&self) -> Vec<EventType> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_type)
                .collect()
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: Event) -> Result<(), TaghubError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    /// Sensor whose source is a pair of shared flags.
    struct FakeSensor {
        metadata: EntityMetadata,
        open: Arc<AtomicBool>,
        reachable: Arc<AtomicBool>,
        available: bool,
        value: Option<bool>,
        handle: Arc<Mutex<Option<UpdateHandle>>>,
        removed: Arc<AtomicBool>,
    }

    impl FakeSensor {
        fn new(unique_id: &str) -> Self {
            let device = DeviceInfo::builder()
                .identifier(unique_id)
                .name("Tag")
                .build()
                .unwrap();
            Self {
                metadata: EntityMetadata::builder()
                    .unique_id(unique_id)
                    .name("Tag")
                    .device(device)
                    .build()
                    .unwrap(),
                open: Arc::new(AtomicBool::new(false)),
                reachable: Arc::new(AtomicBool::new(true)),
                available: true,
                value: None,
                handle: Arc::new(Mutex::new(None)),
                removed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl BinarySensor for FakeSensor {
        fn metadata(&self) -> &EntityMetadata {
            &self.metadata
        }

        fn is_on(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn available(&self) -> bool {
            self.available
        }

        fn native_value(&self) -> Option<bool> {
            self.value
        }

        fn publishers(&self) -> &[Publisher] {
            &[]
        }

        fn update_callback(&mut self) {
            if !self.reachable.load(Ordering::SeqCst) {
                if self.available {
                    self.available = false;
                    self.value = None;
                }
                return;
            }
            self.available = true;
            self.value = Some(self.is_on());
        }

        fn added_to_host(&mut self, handle: UpdateHandle) {
            *self.handle.lock().unwrap() = Some(handle);
        }

        fn will_remove_from_host(&mut self) {
            self.removed.store(true, Ordering::SeqCst);
        }
    }

    fn registry() -> (EntityRegistry<Arc<RecordingPublisher>>, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        (EntityRegistry::new(Arc::clone(&publisher)), publisher)
    }

    #[test]
    fn should_run_first_update_and_publish_created_when_added() {
        let (registry, publisher) = registry();
        let sensor = FakeSensor::new("tag-1");
        sensor.open.store(true, Ordering::SeqCst);

        registry.add_entity(Box::new(sensor)).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("tag-1").unwrap().state, EntityState::On);
        assert_eq!(publisher.types(), vec![EventType::EntityCreated]);
    }

    #[test]
    fn should_reject_duplicate_unique_id() {
        let (registry, _publisher) = registry();
        registry.add_entity(Box::new(FakeSensor::new("tag-1"))).unwrap();

        let result = registry.add_entity(Box::new(FakeSensor::new("tag-1")));

        assert!(matches!(
            result,
            Err(TaghubError::Validation(ValidationError::DuplicateUniqueId(_)))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_publish_state_changed_when_rendered_state_differs() {
        let (registry, publisher) = registry();
        let sensor = FakeSensor::new("tag-1");
        let open = Arc::clone(&sensor.open);
        registry.add_entity(Box::new(sensor)).unwrap();

        open.store(true, Ordering::SeqCst);
        let changed = registry.dispatch_update("tag-1").unwrap();

        assert!(changed);
        let events = publisher.events.lock().unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.event_type, EventType::StateChanged);
        assert_eq!(last.data["from"], "off");
        assert_eq!(last.data["to"], "on");
    }

    #[test]
    fn should_stay_silent_when_state_is_unchanged() {
        let (registry, publisher) = registry();
        registry.add_entity(Box::new(FakeSensor::new("tag-1"))).unwrap();

        let changed = registry.dispatch_update("tag-1").unwrap();

        assert!(!changed);
        assert_eq!(publisher.types(), vec![EventType::EntityCreated]);
    }

    #[test]
    fn should_flip_to_unavailable_once_for_repeated_unreachable_updates() {
        let (registry, publisher) = registry();
        let sensor = FakeSensor::new("tag-1");
        let reachable = Arc::clone(&sensor.reachable);
        registry.add_entity(Box::new(sensor)).unwrap();

        reachable.store(false, Ordering::SeqCst);
        assert!(registry.dispatch_update("tag-1").unwrap());
        assert!(!registry.dispatch_update("tag-1").unwrap());

        assert_eq!(
            registry.get("tag-1").unwrap().state,
            EntityState::Unavailable
        );
        assert_eq!(
            publisher.types(),
            vec![EventType::EntityCreated, EventType::StateChanged]
        );
    }

    #[test]
    fn should_return_not_found_for_unknown_entity() {
        let (registry, _publisher) = registry();
        let result = registry.dispatch_update("missing");
        assert!(matches!(result, Err(TaghubError::NotFound(_))));
    }

    #[test]
    fn should_update_through_handle_given_to_entity() {
        let (registry, _publisher) = registry();
        let sensor = FakeSensor::new("tag-1");
        let open = Arc::clone(&sensor.open);
        let handle = Arc::clone(&sensor.handle);
        registry.add_entity(Box::new(sensor)).unwrap();

        open.store(true, Ordering::SeqCst);
        handle.lock().unwrap().as_ref().unwrap().fire();

        assert_eq!(registry.get("tag-1").unwrap().state, EntityState::On);
    }

    #[test]
    fn should_ignore_handle_fired_after_registry_dropped() {
        let (registry, _publisher) = registry();
        let sensor = FakeSensor::new("tag-1");
        let handle = Arc::clone(&sensor.handle);
        registry.add_entity(Box::new(sensor)).unwrap();
        let fire = handle.lock().unwrap().clone().unwrap();

        drop(registry);
        fire.fire();
    }

    #[test]
    fn should_notify_entity_and_publish_removed() {
        let (registry, publisher) = registry();
        let sensor = FakeSensor::new("tag-1");
        let removed = Arc::clone(&sensor.removed);
        registry.add_entity(Box::new(sensor)).unwrap();

        assert!(registry.remove_entity("tag-1"));
        assert!(!registry.remove_entity("tag-1"));

        assert!(removed.load(Ordering::SeqCst));
        assert!(registry.is_empty());
        assert_eq!(
            publisher.types(),
            vec![EventType::EntityCreated, EventType::EntityRemoved]
        );
    }

    #[test]
    fn should_list_snapshots_sorted_by_unique_id() {
        let (registry, _publisher) = registry();
        registry.add_entities(vec![
            Box::new(FakeSensor::new("tag-b")) as Box<dyn BinarySensor>,
            Box::new(FakeSensor::new("tag-a")),
        ]);

        let ids: Vec<String> = registry
            .snapshots()
            .into_iter()
            .map(|s| s.unique_id)
            .collect();
        assert_eq!(ids, vec!["tag-a".to_string(), "tag-b".to_string()]);

        registry.remove_all();
        assert!(registry.is_empty());
    }
}
