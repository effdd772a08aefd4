//! Fixed strings of the Netatmo integration.

/// Integration name, also used as the device identifier namespace.
pub const DOMAIN: &str = "netatmo";

pub const MANUFACTURER: &str = "Netatmo";

/// Vendor page for security products (cameras, door tags, sirens).
pub const CONF_URL_SECURITY: &str = "https://home.netatmo.com/security";

/// Door tag `status` value meaning the door or window is open.
pub const OPEN_STATUS: &str = "open";

/// Signal fired for a newly seen door tag, until a platform receives it.
pub const NETATMO_CREATE_DOORTAG_SENSOR: &str = "netatmo_create_doortag_sensor";

/// Signal fired once per door tag that left its home.
pub const NETATMO_REMOVE_DOORTAG_SENSOR: &str = "netatmo_remove_doortag_sensor";

/// Publisher group carrying the state of a whole home.
pub const HOME: &str = "home";

/// Signal name of the publisher group of `home_id`.
#[must_use]
pub fn home_signal(home_id: &str) -> String {
    format!("{HOME}-{home_id}")
}
