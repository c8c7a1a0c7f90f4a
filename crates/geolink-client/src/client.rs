//! Client event loop: runs the state machine's commands against the relay.

use std::collections::VecDeque;

use geolink_location::{LocationSource, PermissionGate};
use geolink_protocol::Transport;
use geolink_types::{ClientEvent, DisconnectInfo, Location, RelayEvent, SessionId};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::machine::{Command, ConnectionMachine, Intent, Trigger};
use crate::publisher::LocationPublisher;
use crate::state::{ConnectionState, SessionError};

/// Requests from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Intent(Intent),
    Shutdown,
}

/// Snapshot of the client for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientStatus {
    pub session_id: SessionId,
    pub state: ConnectionState,
    pub error: Option<SessionError>,
    pub remote_location: Option<Location>,
    pub permission_pending: bool,
    pub publishing: bool,
    pub locations_sent: u64,
}

/// A geolink client bound to one relay session.
pub struct Client {
    machine: ConnectionMachine,
    publisher: LocationPublisher,
    transport: Box<dyn Transport>,
    transport_open: bool,
    permission: Box<dyn PermissionGate>,
    source: Box<dyn LocationSource>,
    command_tx: mpsc::Sender<ClientCommand>,
    command_rx: mpsc::Receiver<ClientCommand>,
    status_tx: watch::Sender<ClientStatus>,
}

impl Client {
    /// Create a client for the relay-assigned `session_id`.
    pub fn new(
        config: &Config,
        session_id: SessionId,
        transport: Box<dyn Transport>,
        permission: Box<dyn PermissionGate>,
        source: Box<dyn LocationSource>,
    ) -> Self {
        let machine = ConnectionMachine::new(session_id);
        let publisher = LocationPublisher::new(config.publisher.interval());
        let (command_tx, command_rx) = mpsc::channel(64);
        let (status_tx, _) = watch::channel(snapshot(&machine, &publisher));

        Self {
            machine,
            publisher,
            transport,
            transport_open: true,
            permission,
            source,
            command_tx,
            command_rx,
            status_tx,
        }
    }

    /// Get a clone of the command sender for feeding intents into the client.
    pub fn command_sender(&self) -> mpsc::Sender<ClientCommand> {
        self.command_tx.clone()
    }

    /// Subscribe to status changes.
    pub fn status_receiver(&self) -> watch::Receiver<ClientStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> ClientStatus {
        snapshot(&self.machine, &self.publisher)
    }

    /// Run the event loop until shutdown or the relay transport ends.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        info!(session = %self.machine.session().me(), "client running");
        self.publish_status();

        loop {
            tokio::select! {
                event = self.transport.recv() => {
                    match event {
                        Ok(Some(event)) => {
                            if matches!(event, RelayEvent::Disconnect(_)) {
                                self.transport_open = false;
                            }
                            self.dispatch(Trigger::Relay(event)).await;
                        }
                        Ok(None) => {
                            info!("relay transport ended");
                            self.transport_open = false;
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "relay transport failed");
                            self.transport_lost(e.to_string()).await;
                            break;
                        }
                    }
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(ClientCommand::Intent(intent)) => {
                            self.dispatch(Trigger::Intent(intent)).await;
                        }
                        Some(ClientCommand::Shutdown) | None => {
                            info!("shutting down");
                            break;
                        }
                    }
                }
                peer = self.publisher.tick() => {
                    self.publish_location(peer).await;
                }
            }

            if !self.transport_open {
                info!("relay link closed, stopping");
                break;
            }
        }

        self.shutdown().await
    }

    /// Apply `trigger` and run the resulting commands, including any
    /// triggers those commands feed back.
    async fn dispatch(&mut self, trigger: Trigger) {
        let mut queue = VecDeque::from([trigger]);
        while let Some(trigger) = queue.pop_front() {
            for command in self.machine.apply(trigger) {
                if let Some(follow_up) = self.execute(command).await {
                    queue.push_back(follow_up);
                }
            }
        }
        self.publish_status();
    }

    async fn execute(&mut self, command: Command) -> Option<Trigger> {
        match command {
            Command::Emit(event) => self.send(&event).await.err(),
            Command::RequestPermission(purpose) => {
                // Let the presentation layer show that a prompt is up. No
                // other trigger is handled until the gate answers.
                self.publish_status();
                let granted = match self.permission.request().await {
                    Ok(granted) => granted,
                    Err(e) => {
                        warn!(error = %e, "permission request failed, treating as denied");
                        false
                    }
                };
                debug!(?purpose, granted, "permission resolved");
                Some(Trigger::PermissionResolved { purpose, granted })
            }
            Command::StartPublishing(peer) => {
                self.publisher.activate(peer);
                None
            }
            Command::StopPublishing => {
                self.publisher.deactivate();
                None
            }
        }
    }

    /// Send an event. On failure, returns the trigger describing it: a
    /// disconnect if the link is gone, otherwise a failed send.
    async fn send(&mut self, event: &ClientEvent) -> Result<(), Trigger> {
        if !self.transport_open {
            debug!(event = event.name(), "transport closed, dropping event");
            return Ok(());
        }
        match self.transport.send(event).await {
            Ok(()) => {
                debug!(event = event.name(), to = %event.addressee(), "sent");
                Ok(())
            }
            Err(e) if e.is_disconnect() => {
                warn!(error = %e, event = event.name(), "relay link lost while sending");
                self.transport_open = false;
                Err(Trigger::Relay(RelayEvent::Disconnect(DisconnectInfo {
                    reason: Some(e.to_string()),
                })))
            }
            Err(e) => {
                warn!(error = %e, event = event.name(), "event not sent");
                Err(Trigger::SendFailed {
                    event: event.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn publish_location(&mut self, peer: SessionId) {
        if self.machine.state() != &(ConnectionState::Connected { peer: peer.clone() }) {
            // Unreachable while the machine drives activation; keep the slot honest.
            self.publisher.deactivate();
            return;
        }

        match LocationPublisher::sample(peer, self.source.as_mut()).await {
            Ok(event) => match self.send(&event).await {
                Ok(()) => {
                    self.publisher.record_sent();
                    self.publish_status();
                }
                Err(trigger) => self.dispatch(trigger).await,
            },
            Err(e) => {
                warn!(error = %e, "failed to sample location");
                self.dispatch(Trigger::SamplingFailed(e.to_string())).await;
            }
        }
    }

    async fn transport_lost(&mut self, reason: String) {
        self.transport_open = false;
        self.dispatch(Trigger::Relay(RelayEvent::Disconnect(DisconnectInfo {
            reason: Some(reason),
        })))
        .await;
    }

    async fn shutdown(&mut self) -> Result<(), ClientError> {
        info!("client shutting down");

        if self.transport_open && !self.machine.state().is_idle() {
            self.dispatch(Trigger::Intent(Intent::Cancel)).await;
        }
        self.publisher.deactivate();

        if self.transport_open {
            self.transport_open = false;
            self.transport.close().await?;
        }

        self.publish_status();
        info!(sent = self.publisher.sent(), "client shut down complete");
        Ok(())
    }

    fn publish_status(&self) {
        self.status_tx
            .send_replace(snapshot(&self.machine, &self.publisher));
    }
}

fn snapshot(machine: &ConnectionMachine, publisher: &LocationPublisher) -> ClientStatus {
    let session = machine.session();
    ClientStatus {
        session_id: session.me().clone(),
        state: session.state().clone(),
        error: session.error().cloned(),
        remote_location: session.remote_location().cloned(),
        permission_pending: session.pending_permission().is_some(),
        publishing: publisher.is_active(),
        locations_sent: publisher.sent(),
    }
}
