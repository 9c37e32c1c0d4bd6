//! Session state management for echofield
//!
//! This crate ties the spatial mix to the canvas: the [`NodeStore`] that
//! holds voice nodes, the focus and blur consumers that read published
//! distances, the [`SpatialSession`] that owns all of it, and the
//! [`SessionHandler`] task that serialises commands against a session.

mod commands;
pub mod focus;
mod handler;
mod session;
mod store;

pub use commands::SessionCommand;
pub use focus::{blur_level, focused_source, FocusTracker};
pub use handler::{SessionHandler, DEFAULT_FOCUS_POLL};
pub use session::{SessionSnapshot, SpatialSession};
pub use store::{NodeStore, VoiceNode, REPLY_OFFSET};
