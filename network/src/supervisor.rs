use crate::connector::Connector;
use crate::events::LinkEvent;
use log::{info, warn};
use room_core::Error;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Connection state of the upstream link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Fixed-interval retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait between a failure and the next attempt
    pub backoff: Duration,
    /// Consecutive failed attempts before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(3),
            max_attempts: 5,
        }
    }
}

/// Keeps a [`Connector`] connected, reconnecting after drops.
///
/// A successful connection resets the attempt counter. The supervisor stops
/// when asked to, or with an error once `max_attempts` consecutive attempts
/// have failed.
pub struct LinkSupervisor<C: Connector> {
    connector: C,
    policy: ReconnectPolicy,
    state: ConnectionState,
    events: mpsc::Sender<LinkEvent>,
}

impl<C: Connector> LinkSupervisor<C> {
    pub fn new(connector: C, policy: ReconnectPolicy, events: mpsc::Sender<LinkEvent>) -> Self {
        Self {
            connector,
            policy,
            state: ConnectionState::Disconnected,
            events,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run until `shutdown` fires or reconnecting is abandoned.
    pub async fn run(&mut self, shutdown: oneshot::Receiver<()>) -> Result<(), Error> {
        let result = tokio::select! {
            result = self.supervise() => result,
            _ = shutdown => {
                info!("Link supervisor shutting down");
                Ok(())
            }
        };
        self.transition(ConnectionState::Disconnected).await;
        result
    }

    async fn supervise(&mut self) -> Result<(), Error> {
        loop {
            self.connect_with_retry().await?;

            let reason = self.connector.serve().await;
            warn!("Link dropped: {}", reason);
            self.emit(LinkEvent::Dropped { reason }).await;
            self.transition(ConnectionState::Disconnected).await;
            tokio::time::sleep(self.policy.backoff).await;
        }
    }

    async fn connect_with_retry(&mut self) -> Result<(), Error> {
        let mut attempts = 0;
        loop {
            self.transition(ConnectionState::Connecting).await;
            match self.connector.connect().await {
                Ok(()) => {
                    self.transition(ConnectionState::Connected).await;
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        "Connect attempt {}/{} failed: {}",
                        attempts, self.policy.max_attempts, e
                    );
                    self.transition(ConnectionState::Disconnected).await;

                    if attempts >= self.policy.max_attempts {
                        self.emit(LinkEvent::GaveUp { attempts }).await;
                        return Err(Error::Network(format!(
                            "giving up after {} attempts: {}",
                            attempts, e
                        )));
                    }
                    tokio::time::sleep(self.policy.backoff).await;
                }
            }
        }
    }

    async fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        info!("Link {} -> {}", self.state, next);
        self.state = next;
        self.emit(LinkEvent::StateChanged(next)).await;
    }

    async fn emit(&self, event: LinkEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event).await;
    }
}
