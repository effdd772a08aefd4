//! Netatmo data handler — owns the live door tags and fans updates out.
//!
//! Each refresh applies a home status document: existing door tags are
//! updated in place, new ones are announced on
//! [`NETATMO_CREATE_DOORTAG_SENSOR`], tags that left their home are
//! announced on [`NETATMO_REMOVE_DOORTAG_SENSOR`], and every entity
//! subscribed to the home's publisher group gets one push update afterwards.
//!
//! A door tag counts as announced only once a platform received it. Tags
//! seen while no platform listens are announced again on the next refresh
//! or by [`DataHandler::announce_pending`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use taghub_app::dispatcher::Dispatcher;
use taghub_app::ports::{Publisher, UpdateHandle};

use crate::config::NetatmoConfig;
use crate::constants::{
    HOME, NETATMO_CREATE_DOORTAG_SENSOR, NETATMO_REMOVE_DOORTAG_SENSOR, home_signal,
};
use crate::error::NetatmoError;
use crate::module::{DoorTag, HomeDocument, ModuleType, SharedDoorTag};
use crate::source::HomeStatusSource;

/// Payload of the door tag signals: one door tag and where it lives.
#[derive(Clone)]
pub struct NetatmoDevice {
    /// The live door tag, owned by the data handler.
    pub device: SharedDoorTag,
    pub data_handler: Arc<DataHandler>,
    /// Signal of the publisher group the entity should join.
    pub signal_name: String,
    /// Identifier of the parent home.
    pub home_id: String,
}

impl std::fmt::Debug for NetatmoDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetatmoDevice")
            .field("device", &self.device)
            .field("signal_name", &self.signal_name)
            .field("home_id", &self.home_id)
            .finish_non_exhaustive()
    }
}

/// Counters describing what one document did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Door tags seen for the first time (or under a new home).
    pub discovered: usize,
    /// Door tags handed to a platform, including late announcements.
    pub announced: usize,
    /// Door tags that already existed and were updated in place.
    pub updated: usize,
    /// Door tags that left their home and were dropped.
    pub removed: usize,
    /// Push updates fired.
    pub notified: usize,
}

impl std::ops::AddAssign for RefreshSummary {
    fn add_assign(&mut self, other: Self) {
        self.discovered += other.discovered;
        self.announced += other.announced;
        self.updated += other.updated;
        self.removed += other.removed;
        self.notified += other.notified;
    }
}

struct TrackedTag {
    tag: SharedDoorTag,
    /// Whether a platform received the creation signal.
    announced: bool,
}

impl TrackedTag {
    fn new(tag: SharedDoorTag) -> Self {
        Self {
            tag,
            announced: false,
        }
    }
}

struct PublisherGroup {
    publisher: Publisher,
    subscribers: Vec<UpdateHandle>,
}

/// Shared state of the Netatmo integration.
pub struct DataHandler {
    dispatcher: Dispatcher<NetatmoDevice>,
    /// Door tags by module id.
    door_tags: Mutex<HashMap<String, TrackedTag>>,
    /// Publisher groups by signal name.
    publishers: Mutex<HashMap<String, PublisherGroup>>,
}

impl DataHandler {
    /// Create a handler announcing discoveries on `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher<NetatmoDevice>) -> Self {
        Self {
            dispatcher,
            door_tags: Mutex::new(HashMap::new()),
            publishers: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the latest document from `source` and apply every selected home.
    ///
    /// Homes selected in `config` but absent from the document are logged and
    /// skipped; the other homes are still applied.
    ///
    /// # Errors
    ///
    /// Returns the source's error if no document could be fetched.
    pub fn refresh(
        self: &Arc<Self>,
        source: &dyn HomeStatusSource,
        config: &NetatmoConfig,
    ) -> Result<RefreshSummary, NetatmoError> {
        let status = source.fetch()?;

        for home_id in &config.home_ids {
            if !status.homes.iter().any(|home| &home.id == home_id) {
                let err = NetatmoError::UnknownHome(home_id.clone());
                tracing::warn!(error = %err, "configured home skipped");
            }
        }

        let mut summary = RefreshSummary::default();
        for home in &status.homes {
            if config.includes_home(&home.id) {
                summary += self.apply_home(home);
            }
        }
        tracing::debug!(
            discovered = summary.discovered,
            announced = summary.announced,
            updated = summary.updated,
            removed = summary.removed,
            notified = summary.notified,
            "refresh complete"
        );
        Ok(summary)
    }

    /// Apply one home's module list.
    pub fn apply_home(self: &Arc<Self>, home: &HomeDocument) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        let mut to_announce = Vec::new();
        let mut removed = Vec::new();

        {
            let mut door_tags = self.lock_door_tags();
            let mut seen = HashSet::new();

            for module in &home.modules {
                if module.module_type != ModuleType::NACamDoorTag {
                    tracing::debug!(
                        module_id = %module.id,
                        module_type = %module.module_type,
                        "ignoring module"
                    );
                    continue;
                }
                seen.insert(module.id.as_str());

                let known_here = door_tags
                    .get(&module.id)
                    .map(|tracked| tracked.tag.read().home_id == home.id);
                match known_here {
                    Some(true) => {
                        if let Some(tracked) = door_tags.get(&module.id) {
                            tracked.tag.write().apply(module);
                            if !tracked.announced {
                                to_announce.push(module.id.clone());
                            }
                        }
                        summary.updated += 1;
                    }
                    moved => {
                        if moved == Some(false) {
                            if let Some(previous) = door_tags.remove(&module.id) {
                                tracing::info!(module_id = %module.id, home_id = %home.id, "door tag moved to another home");
                                removed.push(previous);
                            }
                        }
                        let tag = SharedDoorTag::new(DoorTag::from_document(&home.id, module));
                        door_tags.insert(module.id.clone(), TrackedTag::new(tag));
                        to_announce.push(module.id.clone());
                        summary.discovered += 1;
                    }
                }
            }

            let missing: Vec<String> = door_tags
                .iter()
                .filter(|(module_id, tracked)| {
                    !seen.contains(module_id.as_str()) && tracked.tag.read().home_id == home.id
                })
                .map(|(module_id, _)| module_id.clone())
                .collect();
            for module_id in missing {
                if let Some(previous) = door_tags.remove(&module_id) {
                    tracing::info!(%module_id, home_id = %home.id, "door tag left its home");
                    removed.push(previous);
                }
            }
        }

        summary.removed = removed.len();
        for previous in removed {
            if previous.announced {
                self.dispatcher
                    .send(NETATMO_REMOVE_DOORTAG_SENSOR, self.payload(previous.tag));
            }
        }

        for module_id in to_announce {
            if self.announce(&module_id) {
                summary.announced += 1;
            }
        }

        summary.notified = self.notify(&home_signal(&home.id));
        summary
    }

    /// Announce every known door tag no platform has received yet.
    ///
    /// Returns how many were received.
    pub fn announce_pending(self: &Arc<Self>) -> usize {
        let pending: Vec<String> = self
            .lock_door_tags()
            .iter()
            .filter(|(_, tracked)| !tracked.announced)
            .map(|(module_id, _)| module_id.clone())
            .collect();
        pending
            .iter()
            .filter(|module_id| self.announce(module_id))
            .count()
    }

    /// Send the creation signal for one door tag; `true` once received.
    fn announce(self: &Arc<Self>, module_id: &str) -> bool {
        let Some(tag) = self
            .lock_door_tags()
            .get(module_id)
            .map(|tracked| tracked.tag.clone())
        else {
            return false;
        };

        let payload = self.payload(tag);
        let home_id = payload.home_id.clone();
        let received = self.dispatcher.send(NETATMO_CREATE_DOORTAG_SENSOR, payload) > 0;
        if !received {
            tracing::debug!(%module_id, %home_id, "door tag waiting for a platform");
            return false;
        }

        tracing::info!(%module_id, %home_id, "door tag announced");
        if let Some(tracked) = self.lock_door_tags().get_mut(module_id) {
            tracked.announced = true;
        }
        true
    }

    fn payload(self: &Arc<Self>, device: SharedDoorTag) -> NetatmoDevice {
        let home_id = device.read().home_id.clone();
        NetatmoDevice {
            device,
            data_handler: Arc::clone(self),
            signal_name: home_signal(&home_id),
            home_id,
        }
    }

    /// Join `publisher`'s group; `handle` fires on every refresh of it.
    ///
    /// Subscribing the same entity twice to one group keeps a single handle.
    pub fn subscribe(&self, publisher: Publisher, handle: UpdateHandle) {
        let mut publishers = self.lock_publishers();
        let group = publishers
            .entry(publisher.signal_name.clone())
            .or_insert_with(|| PublisherGroup {
                publisher,
                subscribers: Vec::new(),
            });
        group
            .subscribers
            .retain(|existing| existing.unique_id() != handle.unique_id());
        tracing::debug!(
            signal = %group.publisher.signal_name,
            publisher = %group.publisher.name,
            unique_id = %handle.unique_id(),
            "entity subscribed"
        );
        group.subscribers.push(handle);
    }

    /// Leave the group of `signal_name`. Empty groups are dropped.
    pub fn unsubscribe(&self, signal_name: &str, unique_id: &str) {
        let mut publishers = self.lock_publishers();
        if let Some(group) = publishers.get_mut(signal_name) {
            group
                .subscribers
                .retain(|handle| handle.unique_id() != unique_id);
            if group.subscribers.is_empty() {
                publishers.remove(signal_name);
            }
        }
    }

    /// Fire every handle of `signal_name`'s group; returns how many fired.
    pub fn notify(&self, signal_name: &str) -> usize {
        let handles: Vec<UpdateHandle> = self
            .lock_publishers()
            .get(signal_name)
            .map(|group| group.subscribers.clone())
            .unwrap_or_default();
        for handle in &handles {
            handle.fire();
        }
        handles.len()
    }

    /// `unique_id`s of every subscribed entity, deduplicated and sorted.
    #[must_use]
    pub fn subscriber_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock_publishers()
            .values()
            .flat_map(|group| group.subscribers.iter().map(|h| h.unique_id().to_string()))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Live door tag by module id.
    #[must_use]
    pub fn door_tag(&self, module_id: &str) -> Option<SharedDoorTag> {
        self.lock_door_tags()
            .get(module_id)
            .map(|tracked| tracked.tag.clone())
    }

    /// Forget every door tag (integration unload).
    pub fn clear(&self) {
        self.lock_door_tags().clear();
        self.lock_publishers().clear();
    }

    fn lock_door_tags(&self) -> std::sync::MutexGuard<'_, HashMap<String, TrackedTag>> {
        self.door_tags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_publishers(&self) -> std::sync::MutexGuard<'_, HashMap<String, PublisherGroup>> {
        self.publishers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publisher group of a whole home.
#[must_use]
pub fn home_publisher(home_id: &str) -> Publisher {
    Publisher {
        name: HOME.to_string(),
        home_id: home_id.to_string(),
        signal_name: home_signal(home_id),
    }
}
