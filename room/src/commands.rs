use crate::session::SessionSnapshot;
use crate::store::VoiceNode;
use room_core::SourceId;
use tokio::sync::oneshot;

/// Commands accepted by the [`SessionHandler`](crate::SessionHandler)
#[derive(Debug)]
pub enum SessionCommand {
    /// The listener moved to a new canvas position
    MoveListener { x: f32, y: f32 },

    /// A whole new node list arrived (e.g. from the upstream)
    ReplaceNodes(Vec<VoiceNode>),

    /// A single node was added or changed
    UpsertNode(VoiceNode),

    /// A node was deleted
    RemoveNode(SourceId),

    /// Attach freshly recorded audio as a reply to `parent`
    AddReply { parent: SourceId, audio_url: String },

    /// Mute or unmute the whole output
    SetMuted(bool),

    /// Ask for the current state of the mix
    Snapshot(oneshot::Sender<SessionSnapshot>),

    /// Stop the handler
    Shutdown,
}
