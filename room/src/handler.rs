use crate::commands::SessionCommand;
use crate::session::SpatialSession;
use log::{debug, error, info, warn};
use room_core::{Error, SessionEvent};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::MissedTickBehavior;

/// How often focus is re-evaluated while nothing else happens
pub const DEFAULT_FOCUS_POLL: Duration = Duration::from_millis(100);

/// Owns a [`SpatialSession`] and serialises everything that touches it.
///
/// Listener moves, node updates and mute toggles arrive as commands on one
/// channel and are applied in order. Events produced by the session go out
/// on the event channel.
pub struct SessionHandler {
    /// The session being driven
    session: SpatialSession,
    /// Channel for receiving commands
    command_rx: mpsc::Receiver<SessionCommand>,
    /// Channel for sending session events
    event_tx: mpsc::Sender<SessionEvent>,
    focus_poll: Duration,
}

impl SessionHandler {
    pub fn new(
        session: SpatialSession,
        command_rx: mpsc::Receiver<SessionCommand>,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            session,
            command_rx,
            event_tx,
            focus_poll: DEFAULT_FOCUS_POLL,
        }
    }

    /// Change how often focus is polled. A zero period falls back to
    /// [`DEFAULT_FOCUS_POLL`].
    pub fn with_focus_poll(mut self, focus_poll: Duration) -> Self {
        if focus_poll.is_zero() {
            warn!("Ignoring zero focus poll period, using {:?}", DEFAULT_FOCUS_POLL);
        } else {
            self.focus_poll = focus_poll;
        }
        self
    }

    /// Run until a shutdown command arrives or every command sender is gone.
    ///
    /// Returns the session so callers can inspect its final state.
    pub async fn run(mut self) -> Result<SpatialSession, Error> {
        let mut focus_tick = tokio::time::interval(self.focus_poll);
        focus_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        info!("All session command senders dropped, exiting handler");
                        break;
                    };

                    if let SessionCommand::Shutdown = command {
                        info!("Received shutdown command, exiting handler");
                        break;
                    }

                    if let Err(e) = self.handle_command(command) {
                        error!("Error handling session command: {}", e);
                    }
                }

                _ = focus_tick.tick() => {
                    let events = self.session.poll_focus(Instant::now());
                    if let Err(e) = emit_events(&self.event_tx, events) {
                        error!("Error reporting focus change: {}", e);
                    }
                }
            }
        }

        Ok(self.session)
    }

    fn handle_command(&mut self, command: SessionCommand) -> Result<(), Error> {
        let now = Instant::now();
        let events = match command {
            SessionCommand::MoveListener { x, y } => self.session.move_listener(x, y, now),

            SessionCommand::ReplaceNodes(nodes) => {
                debug!("Replacing node list with {} nodes", nodes.len());
                self.session.replace_nodes(nodes, now)
            }

            SessionCommand::UpsertNode(node) => self.session.upsert_node(node, now),

            SessionCommand::RemoveNode(id) => self.session.remove_node(&id, now),

            SessionCommand::AddReply { parent, audio_url } => {
                let (_, events) = self.session.add_reply(&parent, audio_url, now)?;
                events
            }

            SessionCommand::SetMuted(muted) => self.session.set_muted(muted).into_iter().collect(),

            SessionCommand::Snapshot(reply) => {
                if reply.send(self.session.snapshot()).is_err() {
                    debug!("Snapshot requester went away");
                }
                Vec::new()
            }

            SessionCommand::Shutdown => {
                // This is handled in the run method before we reach here
                Vec::new()
            }
        };

        emit_events(&self.event_tx, events)
    }
}

/// Emit session events to the consumer, in order.
///
/// Never waits for room in the channel. Events that do not fit are dropped
/// and logged.
fn emit_events(
    event_tx: &mpsc::Sender<SessionEvent>,
    events: Vec<SessionEvent>,
) -> Result<(), Error> {
    let mut dropped = 0;
    for event in events {
        match event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!("Event channel full, dropping {}", event);
                dropped += 1;
            }
            Err(TrySendError::Closed(_)) => {
                return Err(Error::Session("Session event receiver dropped".to_string()));
            }
        }
    }
    if dropped > 0 {
        warn!("Dropped {} session events, consumer is falling behind", dropped);
    }
    Ok(())
}
