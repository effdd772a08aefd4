//! Netatmo integration configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for the Netatmo integration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetatmoConfig {
    /// Whether the integration is loaded at all.
    pub enabled: bool,
    /// JSON home status snapshot the data handler reads on every refresh.
    pub home_status_path: PathBuf,
    /// Homes to expose. When empty, every home of the document is used.
    pub home_ids: Vec<String>,
    /// Interval between refreshes, in seconds.
    pub scan_interval_secs: u16,
}

impl Default for NetatmoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            home_status_path: PathBuf::from("netatmo_homes.json"),
            home_ids: Vec::new(),
            scan_interval_secs: 60,
        }
    }
}

impl NetatmoConfig {
    /// Whether `home_id` is selected by [`home_ids`](Self::home_ids).
    #[must_use]
    pub fn includes_home(&self, home_id: &str) -> bool {
        self.home_ids.is_empty() || self.home_ids.iter().any(|id| id == home_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = NetatmoConfig::default();
        assert!(config.enabled);
        assert_eq!(config.home_status_path, PathBuf::from("netatmo_homes.json"));
        assert!(config.home_ids.is_empty());
        assert_eq!(config.scan_interval_secs, 60);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            enabled = false
            home_status_path = "/var/lib/taghub/homes.json"
            home_ids = ["5c810cb1e1a2c"]
            scan_interval_secs = 30
        "#;
        let config: NetatmoConfig = toml::from_str(toml).unwrap();
        assert!(!config.enabled);
        assert_eq!(
            config.home_status_path,
            PathBuf::from("/var/lib/taghub/homes.json")
        );
        assert_eq!(config.home_ids, vec!["5c810cb1e1a2c".to_string()]);
        assert_eq!(config.scan_interval_secs, 30);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let config: NetatmoConfig = toml::from_str("scan_interval_secs = 10").unwrap();
        assert_eq!(config.scan_interval_secs, 10);
        assert!(config.enabled);
    }

    #[test]
    fn should_include_every_home_when_no_filter() {
        let config = NetatmoConfig::default();
        assert!(config.includes_home("anything"));
    }

    #[test]
    fn should_include_only_listed_homes() {
        let config = NetatmoConfig {
            home_ids: vec!["a".to_string()],
            ..NetatmoConfig::default()
        };
        assert!(config.includes_home("a"));
        assert!(!config.includes_home("b"));
    }
}
