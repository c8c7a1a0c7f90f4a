//! Connection state machine.
//!
//! Transitions are computed by [`Session::step`], which never performs I/O:
//! it returns the next session value plus the [`Command`]s the caller must
//! run. [`ConnectionMachine`] holds the current session and is the only
//! writer of it.

use geolink_types::{
    ClientEvent, Location, PeerRef, RelayEvent, SessionId, MAX_SESSION_ID_LEN,
};
use tracing::{debug, info, warn};

use crate::state::{ConnectionState, SessionError};

/// Text used when the relay rejects without a reason.
const DEFAULT_REJECTION: &str = "connection rejected";

/// Local user intents from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Ask `target` to receive our location.
    StartSharing(SessionId),
    /// Accept the pending incoming request.
    Accept,
    /// Reject the pending incoming request.
    Reject,
    /// Withdraw our request, or end the current session.
    Cancel,
    /// Dismiss the last error.
    ClearError,
}

/// What a pending permission request is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionPurpose {
    StartSharing(SessionId),
    Accept(SessionId),
}

/// Anything that can move the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Intent(Intent),
    /// Outcome of a [`Command::RequestPermission`].
    PermissionResolved {
        purpose: PermissionPurpose,
        granted: bool,
    },
    /// Inbound protocol or transport lifecycle event.
    Relay(RelayEvent),
    /// The publisher could not read a position.
    SamplingFailed(String),
    /// An emitted event never reached the wire; the link itself is still up.
    SendFailed { event: ClientEvent, reason: String },
}

/// Side effects requested by a transition, run in order by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Emit(ClientEvent),
    /// Ask the permission gate, then feed back [`Trigger::PermissionResolved`].
    RequestPermission(PermissionPurpose),
    StartPublishing(SessionId),
    StopPublishing,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub next: Session,
    pub commands: Vec<Command>,
}

/// Everything the machine knows about this client's peer slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    me: SessionId,
    state: ConnectionState,
    error: Option<SessionError>,
    pending_permission: Option<PermissionPurpose>,
    remote_location: Option<Location>,
}

impl Session {
    /// A fresh idle session for the relay-assigned id `me`.
    pub fn new(me: SessionId) -> Self {
        Self {
            me,
            state: ConnectionState::Idle,
            error: None,
            pending_permission: None,
            remote_location: None,
        }
    }

    pub fn me(&self) -> &SessionId {
        &self.me
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn pending_permission(&self) -> Option<&PermissionPurpose> {
        self.pending_permission.as_ref()
    }

    /// Latest location received from the bound peer.
    pub fn remote_location(&self) -> Option<&Location> {
        self.remote_location.as_ref()
    }

    /// Compute the transition for `trigger`.
    pub fn step(&self, trigger: Trigger) -> Step {
        let mut next = self.clone();
        let mut commands = Vec::new();
        match trigger {
            Trigger::Intent(intent) => next.on_intent(intent, &mut commands),
            Trigger::PermissionResolved { purpose, granted } => {
                next.on_permission(&purpose, granted, &mut commands);
            }
            Trigger::Relay(event) => next.on_relay(event, &mut commands),
            Trigger::SamplingFailed(reason) => {
                if next.state.is_connected() {
                    next.error = Some(SessionError::Sampling(reason));
                }
            }
            Trigger::SendFailed { event, reason } => {
                next.on_send_failed(&event, reason, &mut commands);
            }
        }
        Step { next, commands }
    }

    /// Successful transition: move and clear the error.
    fn enter(&mut self, state: ConnectionState) {
        self.state = state;
        self.error = None;
    }

    /// Back to idle, releasing the peer slot.
    fn release(&mut self, commands: &mut Vec<Command>) {
        if self.state.is_connected() {
            commands.push(Command::StopPublishing);
        }
        self.state = ConnectionState::Idle;
        self.pending_permission = None;
        self.remote_location = None;
    }

    fn on_intent(&mut self, intent: Intent, commands: &mut Vec<Command>) {
        if intent == Intent::ClearError {
            self.error = None;
            return;
        }
        if let Some(pending) = &self.pending_permission {
            debug!(?intent, ?pending, "ignoring intent while permission request is pending");
            return;
        }

        match (intent, self.state.clone()) {
            (Intent::StartSharing(target), ConnectionState::Idle) => {
                if target.is_blank() {
                    self.error = Some(SessionError::InvalidTarget(
                        "session id required".to_string(),
                    ));
                } else if target.as_str().len() > MAX_SESSION_ID_LEN {
                    self.error = Some(SessionError::InvalidTarget(
                        "session id too long".to_string(),
                    ));
                } else if target == self.me {
                    self.error = Some(SessionError::InvalidTarget(
                        "cannot share with yourself".to_string(),
                    ));
                } else {
                    self.error = None;
                    let purpose = PermissionPurpose::StartSharing(target);
                    self.pending_permission = Some(purpose.clone());
                    commands.push(Command::RequestPermission(purpose));
                }
            }
            (
                Intent::Accept,
                ConnectionState::Requested {
                    peer,
                    accepted: false,
                },
            ) => {
                let purpose = PermissionPurpose::Accept(peer);
                self.error = None;
                self.pending_permission = Some(purpose.clone());
                commands.push(Command::RequestPermission(purpose));
            }
            (Intent::Reject, ConnectionState::Requested { peer, .. }) => {
                commands.push(reject(&peer));
                self.release(commands);
                self.error = None;
            }
            (
                Intent::Cancel,
                ConnectionState::Requesting { peer }
                | ConnectionState::Awaiting { peer }
                | ConnectionState::Requested { peer, .. }
                | ConnectionState::Connected { peer },
            ) => {
                commands.push(reject(&peer));
                self.release(commands);
                self.error = None;
            }
            (intent, state) => {
                debug!(?intent, state = %state, "intent not applicable");
            }
        }
    }

    fn on_permission(
        &mut self,
        purpose: &PermissionPurpose,
        granted: bool,
        commands: &mut Vec<Command>,
    ) {
        if self.pending_permission.as_ref() != Some(purpose) {
            warn!(?purpose, "ignoring stale permission outcome");
            return;
        }
        self.pending_permission = None;

        if !granted {
            self.error = Some(SessionError::PermissionRequired);
            return;
        }

        match (purpose, self.state.clone()) {
            (PermissionPurpose::StartSharing(target), ConnectionState::Idle) => {
                let target = target.clone();
                commands.push(Command::Emit(ClientEvent::CreateConnection(PeerRef::new(
                    target.clone(),
                ))));
                self.enter(ConnectionState::Requesting { peer: target });
            }
            (
                PermissionPurpose::Accept(from),
                ConnectionState::Requested {
                    peer,
                    accepted: false,
                },
            ) if *from == peer => {
                commands.push(Command::Emit(ClientEvent::AcceptConnection(PeerRef::new(
                    peer.clone(),
                ))));
                self.enter(ConnectionState::Requested {
                    peer,
                    accepted: true,
                });
            }
            (purpose, state) => {
                debug!(?purpose, state = %state, "permission granted but slot moved on");
            }
        }
    }

    fn on_relay(&mut self, event: RelayEvent, commands: &mut Vec<Command>) {
        match event {
            RelayEvent::Connect(assigned) => {
                if assigned.id != self.me {
                    info!(old = %self.me, new = %assigned.id, "relay assigned a new session id");
                    self.release(commands);
                    *self = Self::new(assigned.id);
                }
            }
            RelayEvent::Disconnect(_) => {
                self.release(commands);
                self.error = Some(SessionError::Disconnected);
            }
            RelayEvent::ConnectionRequested(ack) => match &self.state {
                ConnectionState::Requesting { peer }
                    if ack.id.as_ref().map_or(true, |id| id == peer) =>
                {
                    let peer = peer.clone();
                    self.enter(ConnectionState::Awaiting { peer });
                }
                state => debug!(state = %state, "stale connectionRequested"),
            },
            RelayEvent::ConnectionRequest(from) => self.on_incoming_request(from.id, commands),
            RelayEvent::ConnectionCreated(descriptor) => {
                let bindable = match &self.state {
                    ConnectionState::Requesting { peer } | ConnectionState::Awaiting { peer } => {
                        *peer == descriptor.id
                    }
                    ConnectionState::Requested {
                        peer,
                        accepted: true,
                    } => *peer == descriptor.id,
                    _ => false,
                };
                if bindable {
                    commands.push(Command::StartPublishing(descriptor.id.clone()));
                    self.enter(ConnectionState::Connected {
                        peer: descriptor.id,
                    });
                } else {
                    debug!(peer = %descriptor.id, state = %self.state, "ignoring connectionCreated");
                }
            }
            RelayEvent::ConnectionRejected(rejection) => {
                if self.state.is_idle() {
                    return;
                }
                let message = if rejection.message.trim().is_empty() {
                    DEFAULT_REJECTION.to_string()
                } else {
                    rejection.message
                };
                self.release(commands);
                self.error = Some(SessionError::Rejected(message));
            }
            RelayEvent::Location(msg) => match &self.state {
                // The relay may forward the frame as addressed (our id) or
                // relabel it with the sender (the peer's id).
                ConnectionState::Connected { peer } if msg.id == *peer || msg.id == self.me => {
                    self.remote_location = Some(msg.location);
                }
                state => debug!(from = %msg.id, state = %state, "ignoring location"),
            },
        }
    }

    /// Undo the step that assumed `event` went out.
    fn on_send_failed(
        &mut self,
        event: &ClientEvent,
        reason: String,
        commands: &mut Vec<Command>,
    ) {
        match (event, self.state.clone()) {
            (ClientEvent::CreateConnection(to), ConnectionState::Requesting { peer })
                if to.id == peer =>
            {
                self.release(commands);
            }
            (
                ClientEvent::AcceptConnection(to),
                ConnectionState::Requested {
                    peer,
                    accepted: true,
                },
            ) if to.id == peer => {
                self.state = ConnectionState::Requested {
                    peer,
                    accepted: false,
                };
            }
            _ => {}
        }
        self.error = Some(SessionError::SendFailed(reason));
    }

    fn on_incoming_request(&mut self, from: SessionId, commands: &mut Vec<Command>) {
        if from.is_blank() {
            warn!("ignoring connectionRequest without a session id");
            return;
        }
        if self.state.is_idle() && self.pending_permission.is_none() {
            self.enter(ConnectionState::Requested {
                peer: from,
                accepted: false,
            });
            return;
        }
        // A repeat of the request we are already deciding on. From any other
        // state a request by our peer crosses our own and is refused.
        if matches!(&self.state, ConnectionState::Requested { peer, .. } if *peer == from) {
            debug!(peer = %from, "duplicate connectionRequest from current peer");
            return;
        }
        info!(peer = %from, state = %self.state, "peer slot occupied, rejecting request");
        commands.push(reject(&from));
    }
}

fn reject(peer: &SessionId) -> Command {
    Command::Emit(ClientEvent::RejectConnection(PeerRef::new(peer.clone())))
}

/// Owner of the client's [`Session`].
pub struct ConnectionMachine {
    session: Session,
}

impl ConnectionMachine {
    pub fn new(me: SessionId) -> Self {
        Self {
            session: Session::new(me),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &ConnectionState {
        self.session.state()
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.session.error()
    }

    /// Apply `trigger`, returning the commands the caller must run.
    pub fn apply(&mut self, trigger: Trigger) -> Vec<Command> {
        let Step { next, commands } = self.session.step(trigger);

        if next.state != self.session.state {
            info!(from = %self.session.state, to = %next.state, "connection state changed");
        }
        if next.error != self.session.error {
            if let Some(error) = &next.error {
                warn!(error = %error, state = %next.state, "session error");
            }
        }

        self.session = next;
        commands
    }
}
