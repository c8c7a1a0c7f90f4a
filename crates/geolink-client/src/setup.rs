//! Config loading, backend selection, and relay session setup.

use std::path::PathBuf;
use std::time::Duration;

use geolink_location::simulated::{FixedLocation, NoLocation, StaticPermission, TrackLocation};
use geolink_location::{LocationSource, PermissionGate};
use geolink_protocol::{ProtocolError, Transport, WsTransport};
use geolink_types::{RelayEvent, SessionId};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::{Config, LocationConfig};
use crate::error::ClientError;

/// Load configuration from the given path, or the default location.
pub fn load_config(path: Option<&str>) -> Result<Config, ClientError> {
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => default_config_path(),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {e}")))?;
        info!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else if path.is_some() {
        Err(ClientError::Config(format!(
            "config file not found: {}",
            config_path.display()
        )))
    } else {
        info!("no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("geolink")
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn build_permission(config: &LocationConfig) -> Box<dyn PermissionGate> {
    Box::new(StaticPermission::new(config.permission_granted))
}

/// Pick a position source from config: a track if one is given, else a
/// fixed point, else a source that always reports unavailable.
pub fn build_location_source(
    config: &LocationConfig,
) -> Result<Box<dyn LocationSource>, ClientError> {
    if !config.track.is_empty() {
        let points: Vec<(f64, f64)> = config
            .track
            .iter()
            .map(|w| (w.latitude, w.longitude))
            .collect();
        info!(waypoints = points.len(), "using track location source");
        return Ok(Box::new(TrackLocation::new(&points)?));
    }

    match (config.latitude, config.longitude) {
        (Some(latitude), Some(longitude)) => {
            info!(latitude, longitude, "using fixed location source");
            Ok(Box::new(FixedLocation::new(latitude, longitude)?))
        }
        (None, None) => {
            warn!("no location configured, sharing will report location unavailable");
            Ok(Box::new(NoLocation))
        }
        _ => Err(ClientError::Config(
            "latitude and longitude must be set together".to_string(),
        )),
    }
}

/// Wait for the relay's `connect` event and return the assigned session id.
///
/// Anything else arriving first is skipped.
pub async fn wait_for_session_id(
    transport: &mut dyn Transport,
    timeout: Duration,
) -> Result<SessionId, ClientError> {
    tokio::time::timeout(timeout, next_session_id(transport))
        .await
        .map_err(|_| ClientError::Timeout("relay session id"))?
}

async fn next_session_id(transport: &mut dyn Transport) -> Result<SessionId, ClientError> {
    loop {
        match transport.recv().await? {
            Some(RelayEvent::Connect(assigned)) if !assigned.id.is_blank() => {
                return Ok(assigned.id);
            }
            Some(RelayEvent::Connect(_)) => {
                warn!("relay sent connect without a session id, still waiting");
            }
            Some(RelayEvent::Disconnect(info)) => {
                let reason = info
                    .reason
                    .unwrap_or_else(|| "relay closed before assigning a session".to_string());
                return Err(ClientError::Protocol(ProtocolError::Connection(reason)));
            }
            Some(event) => debug!(event = event.name(), "skipping event before connect"),
            None => return Err(ClientError::Protocol(ProtocolError::Closed)),
        }
    }
}

/// Connect to the configured relay and build a ready-to-run client.
pub async fn connect_client(config: &Config) -> Result<Client, ClientError> {
    let permission = build_permission(&config.location);
    let source = build_location_source(&config.location)?;

    let mut transport = WsTransport::connect(&config.client.relay_url).await?;
    let session_id =
        match wait_for_session_id(&mut transport, config.client.connect_timeout()).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    debug!(error = %close_err, "close after failed handshake");
                }
                return Err(e);
            }
        };
    info!(session = %session_id, relay = %transport.url(), "relay assigned session");

    Ok(Client::new(
        config,
        session_id,
        Box::new(transport),
        permission,
        source,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Waypoint;
    use geolink_protocol::mock::channel_pair;
    use geolink_types::{PeerRef, RequestAck};

    #[test]
    fn missing_explicit_config_is_an_error() {
        let result = load_config(Some("/nonexistent/geolink/config.toml"));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn config_dir_ends_with_geolink() {
        assert!(config_dir().ends_with("geolink"));
        assert!(default_config_path().ends_with("geolink/config.toml"));
    }

    #[test]
    fn half_configured_point_is_rejected() {
        let config = LocationConfig {
            latitude: Some(1.0),
            ..LocationConfig::default()
        };
        assert!(matches!(
            build_location_source(&config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let config = LocationConfig {
            track: vec![Waypoint {
                latitude: 95.0,
                longitude: 0.0,
            }],
            ..LocationConfig::default()
        };
        assert!(matches!(
            build_location_source(&config),
            Err(ClientError::Location(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_source_is_unavailable() {
        let mut source = build_location_source(&LocationConfig::default()).unwrap();
        assert!(geolink_location::sample(source.as_mut()).await.is_err());
    }

    #[tokio::test]
    async fn waits_past_other_events_for_connect() {
        let (mut transport, relay) = channel_pair();
        relay.deliver(&RelayEvent::ConnectionRequested(RequestAck::default()));
        relay.deliver(&RelayEvent::Connect(PeerRef::new(SessionId::new("A"))));

        let id = wait_for_session_id(&mut transport, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(id.as_str(), "A");
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_connect() {
        let (mut transport, _relay) = channel_pair();
        let result = wait_for_session_id(&mut transport, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ClientError::Timeout(_))));
    }

    #[tokio::test]
    async fn hang_up_before_connect_fails() {
        let (mut transport, mut relay) = channel_pair();
        relay.hang_up();
        let result = wait_for_session_id(&mut transport, Duration::from_secs(1)).await;
        assert!(matches!(
            result,
            Err(ClientError::Protocol(ProtocolError::Connection(_)))
        ));
    }
}
