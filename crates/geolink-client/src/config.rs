//! Client configuration loaded from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest publish period accepted; smaller values are raised to this.
pub const MIN_PUBLISH_INTERVAL_MS: u64 = 100;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub location: LocationConfig,
}

/// Relay connection and runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// How long to wait for the relay to assign a session id.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

/// Location publisher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl PublisherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_PUBLISH_INTERVAL_MS))
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

/// Where positions and permission answers come from when there is no
/// device location service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_true")]
    pub permission_granted: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Waypoints walked one per sample; takes precedence over a fixed point.
    #[serde(default)]
    pub track: Vec<Waypoint>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            permission_granted: true,
            latitude: None,
            longitude: None,
            track: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

fn default_relay_url() -> String {
    "ws://localhost:3000".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("relay_url = \"ws://localhost:3000\""));
        assert!(toml_str.contains("interval_ms = 5000"));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.publisher.interval(), Duration::from_secs(5));
        assert!(config.location.permission_granted);
        assert_eq!(config.client.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn parse_example_config() {
        let toml_str = r#"
[client]
relay_url = "wss://relay.example.net/ws"
connect_timeout_ms = 2500
log_level = "debug"

[publisher]
interval_ms = 2000

[location]
permission_granted = false
latitude = 51.5072
longitude = -0.1276

[[location.track]]
latitude = 51.5
longitude = -0.12

[[location.track]]
latitude = 51.51
longitude = -0.13
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.client.relay_url, "wss://relay.example.net/ws");
        assert_eq!(config.publisher.interval(), Duration::from_secs(2));
        assert!(!config.location.permission_granted);
        assert_eq!(config.location.latitude, Some(51.5072));
        assert_eq!(config.location.track.len(), 2);
    }

    #[test]
    fn tiny_interval_is_raised() {
        let config = PublisherConfig { interval_ms: 0 };
        assert_eq!(
            config.interval(),
            Duration::from_millis(MIN_PUBLISH_INTERVAL_MS)
        );
    }
}
