//! Mock permission and location backends for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use geolink_types::{Coords, Location};

use crate::error::LocationError;
use crate::{LocationSource, PermissionGate};

// ---------------------------------------------------------------------------
// MockPermission
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct MockPermissionState {
    queued: VecDeque<bool>,
    default: bool,
    delay: Option<Duration>,
    requests: u32,
}

/// Scriptable permission gate.
///
/// Answers from a queue of scripted decisions, falling back to a default.
/// An optional delay simulates a prompt the user takes time to answer.
pub struct MockPermission {
    state: Arc<Mutex<MockPermissionState>>,
}

impl MockPermission {
    /// A gate that answers `default` unless told otherwise.
    pub fn new(default: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockPermissionState {
                queued: VecDeque::new(),
                default,
                delay: None,
                requests: 0,
            })),
        }
    }

    /// Get a clonable handle for scripting and observing from tests.
    pub fn handle(&self) -> MockPermissionHandle {
        MockPermissionHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable handle onto a [`MockPermission`].
#[derive(Clone)]
pub struct MockPermissionHandle {
    state: Arc<Mutex<MockPermissionState>>,
}

impl MockPermissionHandle {
    /// Queue the answer for the next request.
    pub fn answer_next(&self, granted: bool) {
        self.state.lock().unwrap().queued.push_back(granted);
    }

    /// Change the fallback answer.
    pub fn set_default(&self, granted: bool) {
        self.state.lock().unwrap().default = granted;
    }

    /// Make every request take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Number of requests made so far.
    pub fn requests(&self) -> u32 {
        self.state.lock().unwrap().requests
    }
}

#[async_trait]
impl PermissionGate for MockPermission {
    async fn request(&mut self) -> Result<bool, LocationError> {
        let (answer, delay) = {
            let mut state = self.state.lock().unwrap();
            state.requests += 1;
            let answer = state.queued.pop_front().unwrap_or(state.default);
            (answer, state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(answer)
    }
}

// ---------------------------------------------------------------------------
// MockLocation
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct MockLocationState {
    last_known: Option<Location>,
    current: Location,
    failure: Option<String>,
    fresh_samples: u32,
}

/// Scriptable location source.
pub struct MockLocation {
    state: Arc<Mutex<MockLocationState>>,
}

impl MockLocation {
    /// A source whose fresh fix is `(latitude, longitude)` at timestamp 0.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        let current = Location::new(Coords::new(latitude, longitude)?, 0);
        Ok(Self {
            state: Arc::new(Mutex::new(MockLocationState {
                last_known: None,
                current,
                failure: None,
                fresh_samples: 0,
            })),
        })
    }

    pub fn handle(&self) -> MockLocationHandle {
        MockLocationHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable handle onto a [`MockLocation`].
#[derive(Clone)]
pub struct MockLocationHandle {
    state: Arc<Mutex<MockLocationState>>,
}

impl MockLocationHandle {
    /// Set (or clear) the cached fix.
    pub fn set_last_known(&self, location: Option<Location>) {
        self.state.lock().unwrap().last_known = location;
    }

    /// Make every sample fail with `reason` until cleared with `None`.
    pub fn set_failure(&self, reason: Option<&str>) {
        self.state.lock().unwrap().failure = reason.map(ToString::to_string);
    }

    /// Number of fresh (non-cached) samples taken.
    pub fn fresh_samples(&self) -> u32 {
        self.state.lock().unwrap().fresh_samples
    }
}

#[async_trait]
impl LocationSource for MockLocation {
    async fn last_known(&mut self) -> Result<Option<Location>, LocationError> {
        let state = self.state.lock().unwrap();
        if let Some(reason) = &state.failure {
            return Err(LocationError::Unavailable(reason.clone()));
        }
        Ok(state.last_known.clone())
    }

    async fn current(&mut self) -> Result<Location, LocationError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.failure {
            return Err(LocationError::Unavailable(reason.clone()));
        }
        state.fresh_samples += 1;
        Ok(state.current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;

    #[tokio::test]
    async fn permission_answers_queue_then_default() {
        let mut gate = MockPermission::new(false);
        let handle = gate.handle();
        handle.answer_next(true);

        assert!(gate.request().await.unwrap());
        assert!(!gate.request().await.unwrap());
        assert_eq!(handle.requests(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn permission_delay_suspends() {
        let mut gate = MockPermission::new(true);
        gate.handle().set_delay(Duration::from_secs(3));

        let start = tokio::time::Instant::now();
        assert!(gate.request().await.unwrap());
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn sample_prefers_cached_fix() {
        let mut source = MockLocation::new(1.0, 1.0).unwrap();
        let handle = source.handle();
        handle.set_last_known(Some(Location::new(Coords::new(5.0, 5.0).unwrap(), 9)));

        let loc = sample(&mut source).await.unwrap();
        assert_eq!(loc.timestamp, 9);
        assert_eq!(handle.fresh_samples(), 0);

        handle.set_last_known(None);
        let loc = sample(&mut source).await.unwrap();
        assert_eq!(loc.timestamp, 0);
        assert_eq!(handle.fresh_samples(), 1);
    }

    #[tokio::test]
    async fn failure_is_reported() {
        let mut source = MockLocation::new(1.0, 1.0).unwrap();
        source.handle().set_failure(Some("gps off"));
        assert!(matches!(
            sample(&mut source).await,
            Err(LocationError::Unavailable(reason)) if reason == "gps off"
        ));
    }
}
