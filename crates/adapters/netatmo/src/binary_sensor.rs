//! Door tag binary sensor platform.
//!
//! [`setup_entry`] listens for [`NETATMO_CREATE_DOORTAG_SENSOR`] and turns
//! every announced door tag into a [`DoorTagBinarySensor`] registered with
//! the host. The sensor then follows the live [`SharedDoorTag`] through push
//! updates from the data handler, until [`NETATMO_REMOVE_DOORTAG_SENSOR`]
//! takes it off the host again.

use std::sync::Arc;

use taghub_app::dispatcher::{Dispatcher, Subscription};
use taghub_app::ports::{BinarySensor, EntityHost, Publisher, UpdateHandle};
use taghub_domain::entity::{BinarySensorDeviceClass, EntityMetadata};
use taghub_domain::error::TaghubError;

use crate::constants::{
    CONF_URL_SECURITY, HOME, NETATMO_CREATE_DOORTAG_SENSOR, NETATMO_REMOVE_DOORTAG_SENSOR,
};
use crate::data_handler::NetatmoDevice;
use crate::entity_base::{NetatmoBase, module_device_info};
use crate::module::SharedDoorTag;

/// Which door tag field a sensor reads and how the host labels it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorTagDescription {
    /// Suffix of the `unique_id`.
    pub key: String,
    /// Suffix of the display name.
    pub name: String,
    /// Field name on the vendor side.
    pub netatmo_name: String,
    pub device_class: BinarySensorDeviceClass,
}

impl Default for DoorTagDescription {
    fn default() -> Self {
        Self {
            key: "doortag".to_string(),
            name: "Door Tag".to_string(),
            netatmo_name: "doortag".to_string(),
            device_class: BinarySensorDeviceClass::Opening,
        }
    }
}

/// Build the `unique_id` of a door tag sensor.
#[must_use]
pub fn door_tag_unique_id(home_id: &str, module_id: &str, key: &str) -> String {
    format!("{home_id}-{module_id}-{key}")
}

/// Opening sensor backed by one door tag.
#[derive(Debug)]
pub struct DoorTagBinarySensor {
    base: NetatmoBase,
    device: SharedDoorTag,
    metadata: EntityMetadata,
    available: bool,
    native_value: Option<bool>,
}

impl DoorTagBinarySensor {
    /// Build the sensor of an announced door tag.
    ///
    /// # Errors
    ///
    /// Returns [`TaghubError::Validation`] when the door tag has no id or
    /// name to derive the entity identity from.
    pub fn new(
        netatmo_device: NetatmoDevice,
        description: &DoorTagDescription,
    ) -> Result<Self, TaghubError> {
        let NetatmoDevice {
            device,
            data_handler,
            signal_name,
            home_id,
        } = netatmo_device;

        let (metadata, is_open) = {
            let tag = device.read();
            let unique_id = if tag.entity_id.is_empty() {
                String::new()
            } else {
                door_tag_unique_id(&home_id, &tag.entity_id, &description.key)
            };
            let metadata = EntityMetadata::builder()
                .unique_id(unique_id)
                .name(format!("{} {}", tag.name, description.name))
                .device_class(description.device_class)
                .entity_category(None)
                .device(module_device_info(&tag, CONF_URL_SECURITY)?)
                .build()?;
            (metadata, tag.is_open())
        };

        let publishers = vec![Publisher {
            name: HOME.to_string(),
            home_id,
            signal_name,
        }];

        Ok(Self {
            base: NetatmoBase::new(data_handler, publishers),
            device,
            metadata,
            available: true,
            native_value: Some(is_open),
        })
    }
}

impl BinarySensor for DoorTagBinarySensor {
    fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    fn is_on(&self) -> bool {
        self.device.read().is_open()
    }

    fn available(&self) -> bool {
        self.available
    }

    fn native_value(&self) -> Option<bool> {
        self.native_value
    }

    fn publishers(&self) -> &[Publisher] {
        self.base.publishers()
    }

    fn update_callback(&mut self) {
        let (reachable, is_open) = {
            let tag = self.device.read();
            (tag.is_reachable(), tag.is_open())
        };

        if !reachable {
            if self.available {
                tracing::info!(unique_id = %self.metadata.unique_id, "door tag unreachable");
                self.available = false;
                self.native_value = None;
            }
            return;
        }

        self.available = true;
        self.native_value = Some(is_open);
    }

    fn added_to_host(&mut self, handle: UpdateHandle) {
        self.base.subscribe(&handle);
    }

    fn will_remove_from_host(&mut self) {
        self.base.unsubscribe();
    }
}

/// Connect the door tag platform: every announced door tag becomes one
/// sensor added to `host`, and every door tag that left its home is removed
/// from it.
///
/// Dropping the returned subscriptions stops the platform.
pub fn setup_entry(
    dispatcher: &Dispatcher<NetatmoDevice>,
    host: Arc<dyn EntityHost>,
    description: DoorTagDescription,
) -> Vec<Subscription> {
    let create = {
        let host = Arc::clone(&host);
        let description = description.clone();
        dispatcher.connect(NETATMO_CREATE_DOORTAG_SENSOR, move |netatmo_device| {
            match DoorTagBinarySensor::new(netatmo_device, &description) {
                Ok(sensor) => {
                    tracing::debug!(unique_id = %sensor.metadata.unique_id, "adding door tag sensor");
                    host.add_entities(vec![Box::new(sensor) as Box<dyn BinarySensor>]);
                }
                Err(err) => tracing::warn!(error = %err, "door tag sensor skipped"),
            }
        })
    };

    let remove = dispatcher.connect(NETATMO_REMOVE_DOORTAG_SENSOR, move |netatmo_device| {
        let module_id = netatmo_device.device.read().entity_id.clone();
        let unique_id = door_tag_unique_id(&netatmo_device.home_id, &module_id, &description.key);
        if host.remove_entity(&unique_id) {
            tracing::debug!(%unique_id, "removed door tag sensor");
        }
    });

    vec![create, remove]
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use taghub_domain::entity::EntityState;

    use super::*;
    use crate::data_handler::DataHandler;
    use crate::module::{DoorTag, ModuleType};

    fn door_tag(status: &str, reachable: Option<bool>) -> DoorTag {
        DoorTag {
            entity_id: "70:ee:50:00:00:01".to_string(),
            name: "Front Door".to_string(),
            room_id: Some("2255031728".to_string()),
            device_type: ModuleType::NACamDoorTag,
            status: Some(status.to_string()),
            reachable,
            home_id: "h1".to_string(),
        }
    }

    fn netatmo_device(tag: DoorTag) -> (NetatmoDevice, Arc<DataHandler>) {
        let handler = Arc::new(DataHandler::new(Dispatcher::new()));
        let home_id = tag.home_id.clone();
        let device = NetatmoDevice {
            device: SharedDoorTag::new(tag),
            data_handler: Arc::clone(&handler),
            signal_name: format!("home-{home_id}"),
            home_id,
        };
        (device, handler)
    }

    fn build_sensor(status: &str, reachable: Option<bool>) -> (DoorTagBinarySensor, SharedDoorTag) {
        let (device, _handler) = netatmo_device(door_tag(status, reachable));
        let shared = device.device.clone();
        (
            DoorTagBinarySensor::new(device, &DoorTagDescription::default()).unwrap(),
            shared,
        )
    }

    #[derive(Default)]
    struct CollectingHost {
        added: Mutex<Vec<Box<dyn BinarySensor>>>,
    }

    impl EntityHost for CollectingHost {
        fn add_entities(&self, entities: Vec<Box<dyn BinarySensor>>) {
            self.added.lock().unwrap().extend(entities);
        }

        fn remove_entity(&self, unique_id: &str) -> bool {
            let mut added = self.added.lock().unwrap();
            let before = added.len();
            added.retain(|entity| entity.metadata().unique_id != unique_id);
            added.len() != before
        }
    }

    #[test]
    fn should_freeze_identity_at_construction() {
        let (sensor, shared) = build_sensor("open", Some(true));
        let metadata = sensor.metadata();
        assert_eq!(metadata.unique_id, "h1-70:ee:50:00:00:01-doortag");
        assert_eq!(metadata.name, "Front Door Door Tag");
        assert_eq!(metadata.device_class, Some(BinarySensorDeviceClass::Opening));
        assert_eq!(metadata.entity_category, None);
        assert_eq!(
            metadata.device.configuration_url.as_deref(),
            Some("https://home.netatmo.com/security")
        );
        assert_eq!(metadata.device.model.as_deref(), Some("NACamDoorTag"));
        assert_eq!(metadata.device.suggested_area.as_deref(), Some("2255031728"));

        shared.write().name = "Renamed".to_string();
        assert_eq!(sensor.metadata().name, "Front Door Door Tag");
    }

    #[test]
    fn should_register_one_home_publisher() {
        let (sensor, _shared) = build_sensor("open", Some(true));
        assert_eq!(
            sensor.publishers(),
            &[Publisher {
                name: "home".to_string(),
                home_id: "h1".to_string(),
                signal_name: "home-h1".to_string(),
            }]
        );
    }

    #[test]
    fn should_start_available_with_value_from_handle() {
        let (open, _) = build_sensor("open", Some(true));
        assert!(open.available());
        assert_eq!(open.native_value(), Some(true));

        let (closed, _) = build_sensor("closed", Some(false));
        assert!(closed.available());
        assert_eq!(closed.native_value(), Some(false));
    }

    #[test]
    fn should_read_is_on_fresh_from_handle() {
        let (sensor, shared) = build_sensor("closed", Some(true));
        assert!(!sensor.is_on());

        shared.write().status = Some("open".to_string());

        assert!(sensor.is_on());
    }

    #[test]
    fn should_report_on_only_for_open_status() {
        for (status, expected) in [
            ("open", true),
            ("closed", false),
            ("no_news", false),
            ("undefined", false),
            ("Open", false),
        ] {
            let (sensor, _) = build_sensor(status, Some(true));
            assert_eq!(sensor.is_on(), expected, "status {status}");
        }
    }

    #[test]
    fn should_report_open_and_reachable_as_on() {
        let (mut sensor, _) = build_sensor("open", Some(true));
        sensor.update_callback();
        assert!(sensor.is_on());
        assert!(sensor.available());
        assert_eq!(sensor.state(), EntityState::On);
    }

    #[test]
    fn should_report_closed_and_reachable_as_off() {
        let (mut sensor, _) = build_sensor("closed", Some(true));
        sensor.update_callback();
        assert!(!sensor.is_on());
        assert!(sensor.available());
        assert_eq!(sensor.state(), EntityState::Off);
    }

    #[test]
    fn should_become_unavailable_and_clear_value_when_unreachable() {
        let (mut sensor, shared) = build_sensor("open", Some(true));
        sensor.update_callback();

        shared.write().reachable = Some(false);
        sensor.update_callback();

        assert!(!sensor.available());
        assert_eq!(sensor.native_value(), None);
        assert_eq!(sensor.state(), EntityState::Unavailable);
    }

    #[test]
    fn should_change_nothing_on_repeated_unreachable_push() {
        let (mut sensor, shared) = build_sensor("open", Some(false));
        sensor.update_callback();
        assert!(!sensor.available());

        shared.write().status = Some("closed".to_string());
        sensor.update_callback();

        assert!(!sensor.available());
        assert_eq!(sensor.native_value(), None);
    }

    #[test]
    fn should_treat_missing_reachable_as_unreachable() {
        let (mut sensor, _) = build_sensor("open", None);
        sensor.update_callback();
        assert!(!sensor.available());
    }

    #[test]
    fn should_recover_when_reachable_again() {
        let (mut sensor, shared) = build_sensor("open", Some(false));
        sensor.update_callback();

        {
            let mut tag = shared.write();
            tag.reachable = Some(true);
            tag.status = Some("closed".to_string());
        }
        sensor.update_callback();

        assert!(sensor.available());
        assert_eq!(sensor.native_value(), Some(false));
    }

    #[test]
    fn should_derive_unique_id_deterministically() {
        assert_eq!(
            door_tag_unique_id("h1", "m1", "doortag"),
            door_tag_unique_id("h1", "m1", "doortag")
        );
        assert_ne!(
            door_tag_unique_id("h1", "m1", "doortag"),
            door_tag_unique_id("h1", "m2", "doortag")
        );
        assert_ne!(
            door_tag_unique_id("h1", "m1", "doortag"),
            door_tag_unique_id("h2", "m1", "doortag")
        );
    }

    #[test]
    fn should_subscribe_on_add_and_unsubscribe_on_remove() {
        let (device, handler) = netatmo_device(door_tag("open", Some(true)));
        let mut sensor = DoorTagBinarySensor::new(device, &DoorTagDescription::default()).unwrap();

        let unique_id = sensor.metadata().unique_id.clone();
        sensor.added_to_host(UpdateHandle::new(unique_id, |_| {}));
        assert_eq!(
            handler.subscriber_ids(),
            vec!["h1-70:ee:50:00:00:01-doortag".to_string()]
        );

        sensor.will_remove_from_host();
        assert!(handler.subscriber_ids().is_empty());
    }

    #[test]
    fn should_add_one_sensor_per_announced_door_tag() {
        let dispatcher = Dispatcher::new();
        let host = Arc::new(CollectingHost::default());
        let _subs = setup_entry(
            &dispatcher,
            Arc::clone(&host) as Arc<dyn EntityHost>,
            DoorTagDescription::default(),
        );

        let (device, _handler) = netatmo_device(door_tag("open", Some(true)));
        dispatcher.send(NETATMO_CREATE_DOORTAG_SENSOR, device);

        let added = host.added.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].metadata().unique_id, "h1-70:ee:50:00:00:01-doortag");
    }

    #[test]
    fn should_remove_sensor_of_door_tag_that_left() {
        let dispatcher = Dispatcher::new();
        let host = Arc::new(CollectingHost::default());
        let _subs = setup_entry(
            &dispatcher,
            Arc::clone(&host) as Arc<dyn EntityHost>,
            DoorTagDescription::default(),
        );
        let (device, _handler) = netatmo_device(door_tag("open", Some(true)));
        dispatcher.send(NETATMO_CREATE_DOORTAG_SENSOR, device.clone());

        dispatcher.send(NETATMO_REMOVE_DOORTAG_SENSOR, device);

        assert!(host.added.lock().unwrap().is_empty());
    }

    #[test]
    fn should_skip_door_tag_without_name() {
        let dispatcher = Dispatcher::new();
        let host = Arc::new(CollectingHost::default());
        let _subs = setup_entry(
            &dispatcher,
            Arc::clone(&host) as Arc<dyn EntityHost>,
            DoorTagDescription::default(),
        );
        let mut tag = door_tag("open", Some(true));
        tag.name = String::new();
        let (device, _handler) = netatmo_device(tag);

        dispatcher.send(NETATMO_CREATE_DOORTAG_SENSOR, device);

        assert!(host.added.lock().unwrap().is_empty());
    }

    #[test]
    fn should_reject_door_tag_without_id() {
        let mut tag = door_tag("open", Some(true));
        tag.entity_id = String::new();
        let (device, _handler) = netatmo_device(tag);

        let result = DoorTagBinarySensor::new(device, &DoorTagDescription::default());

        assert!(matches!(result, Err(TaghubError::Validation(_))));
    }

    #[test]
    fn should_stop_adding_after_subscription_dropped() {
        let dispatcher = Dispatcher::new();
        let host = Arc::new(CollectingHost::default());
        let subs = setup_entry(
            &dispatcher,
            Arc::clone(&host) as Arc<dyn EntityHost>,
            DoorTagDescription::default(),
        );
        drop(subs);

        let (device, _handler) = netatmo_device(door_tag("open", Some(true)));
        dispatcher.send(NETATMO_CREATE_DOORTAG_SENSOR, device);

        assert!(host.added.lock().unwrap().is_empty());
    }
}
