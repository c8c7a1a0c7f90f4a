//! Periodic location publishing to the bound peer.

use std::time::Duration;

use geolink_location::{LocationError, LocationSource};
use geolink_types::{ClientEvent, LocationMessage, SessionId};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::info;

struct Active {
    peer: SessionId,
    ticker: Interval,
}

/// Emits the device position to the bound peer on a fixed period.
///
/// Owned by the client event loop. Active only between
/// [`activate`](Self::activate) and [`deactivate`](Self::deactivate);
/// deactivating drops the timer, so no tick can fire afterwards.
pub struct LocationPublisher {
    period: Duration,
    active: Option<Active>,
    sent: u64,
}

impl LocationPublisher {
    /// `period` must be non-zero.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            active: None,
            sent: 0,
        }
    }

    /// Start publishing to `peer`. The first tick fires one period from now.
    pub fn activate(&mut self, peer: SessionId) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            peer = %peer,
            period_ms = u64::try_from(self.period.as_millis()).unwrap_or(u64::MAX),
            "location publishing started"
        );
        self.active = Some(Active { peer, ticker });
    }

    /// Stop publishing. A no-op when already inactive.
    pub fn deactivate(&mut self) {
        if let Some(active) = self.active.take() {
            info!(peer = %active.peer, sent = self.sent, "location publishing stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Wait for the next tick, yielding the peer to publish to.
    ///
    /// Never resolves while inactive. Cancel-safe.
    pub async fn tick(&mut self) -> SessionId {
        match &mut self.active {
            Some(active) => {
                active.ticker.tick().await;
                active.peer.clone()
            }
            None => std::future::pending().await,
        }
    }

    /// Sample a position and address it to `peer`.
    pub async fn sample(
        peer: SessionId,
        source: &mut dyn LocationSource,
    ) -> Result<ClientEvent, LocationError> {
        let location = geolink_location::sample(source).await?;
        Ok(ClientEvent::Location(LocationMessage { id: peer, location }))
    }

    /// Count a location that reached the transport.
    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    /// Locations sent since this publisher was created.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}
