use crate::ConnectionState;

/// Events emitted by the link supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link moved to a new state
    StateChanged(ConnectionState),

    /// An established link dropped
    Dropped {
        /// Why the link ended
        reason: String,
    },

    /// Every reconnect attempt failed; the supervisor has stopped
    GaveUp {
        /// Number of consecutive failed attempts
        attempts: u32,
    },
}
