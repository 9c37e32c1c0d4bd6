use crate::SourceId;

/// Events a spatial session reports to its UI-side consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A playback handle was created for a newly seen source
    SourceRegistered(SourceId),
    /// A playback handle was released because its source left the canvas
    SourceReleased(SourceId),
    /// The focused source changed (`None` when nothing is in range)
    FocusChanged(Option<SourceId>),
    /// The listener lingered near a source long enough to reply to it
    ReplyUnlocked(SourceId),
    /// Global output mute was toggled
    MuteChanged(bool),
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::SourceRegistered(id) => write!(f, "registered {}", id),
            SessionEvent::SourceReleased(id) => write!(f, "released {}", id),
            SessionEvent::FocusChanged(Some(id)) => write!(f, "focus on {}", id),
            SessionEvent::FocusChanged(None) => write!(f, "focus cleared"),
            SessionEvent::ReplyUnlocked(id) => write!(f, "reply unlocked for {}", id),
            SessionEvent::MuteChanged(muted) => {
                write!(f, "{}", if *muted { "muted" } else { "unmuted" })
            }
        }
    }
}
