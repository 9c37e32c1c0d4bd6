//! Upstream node feed
//!
//! Each line received from the upstream is a whole JSON node list. Lines are
//! parsed here and forwarded to the session as `ReplaceNodes`; anything that
//! does not parse is logged and dropped.

use log::{error, info, warn};
use network::{LinkEvent, LinkSupervisor, ReconnectPolicy, TcpConnector};
use room::{NodeStore, SessionCommand};
use settings_manager::LinkSettings;
use std::net::SocketAddr;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Handle to a running upstream link
pub struct Link {
    shutdown: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<()>,
    forwarder: JoinHandle<()>,
}

impl Link {
    /// Dial `address` and keep feeding node lists into `commands`.
    pub fn spawn(
        address: SocketAddr,
        settings: &LinkSettings,
        commands: mpsc::Sender<SessionCommand>,
    ) -> Self {
        let (line_tx, line_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let policy = ReconnectPolicy {
            backoff: settings.backoff(),
            max_attempts: settings.max_attempts,
        };
        let mut supervisor =
            LinkSupervisor::new(TcpConnector::new(address, line_tx), policy, event_tx);

        let supervisor = tokio::spawn(async move {
            match supervisor.run(shutdown_rx).await {
                Ok(()) => info!("Link to {} closed", address),
                Err(e) => error!("Link to {} abandoned: {}", address, e),
            }
        });
        let forwarder = tokio::spawn(forward(line_rx, event_rx, commands));

        Self {
            shutdown: Some(shutdown_tx),
            supervisor,
            forwarder,
        }
    }

    /// Stop the link and wait for its tasks to finish.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The supervisor may already have given up
            let _ = shutdown.send(());
        }
        if let Err(e) = self.supervisor.await {
            warn!("Link supervisor task failed: {}", e);
        }
        if let Err(e) = self.forwarder.await {
            warn!("Link forwarder task failed: {}", e);
        }
    }
}

/// Turn upstream lines into session commands until the link is gone.
pub async fn forward(
    mut lines: mpsc::Receiver<String>,
    mut events: mpsc::Receiver<LinkEvent>,
    commands: mpsc::Sender<SessionCommand>,
) {
    loop {
        tokio::select! {
            Some(line) = lines.recv() => {
                match NodeStore::parse_nodes(&line) {
                    Ok(nodes) => {
                        if commands.send(SessionCommand::ReplaceNodes(nodes)).await.is_err() {
                            warn!("Session is gone, dropping upstream feed");
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring upstream line: {}", e),
                }
            }

            Some(event) = events.recv() => match event {
                LinkEvent::StateChanged(state) => info!("Upstream link {}", state),
                LinkEvent::Dropped { reason } => warn!("Upstream link dropped: {}", reason),
                LinkEvent::GaveUp { attempts } => {
                    error!("Upstream unreachable after {} attempts", attempts)
                }
            },

            else => break,
        }
    }
}
