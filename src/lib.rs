//! echofield: proximity-driven spatial mixing for a canvas of looping voices
//!
//! The workspace is split by concern and this crate re-exports the pieces an
//! embedder needs:
//!
//! - [`types`]: ids, positions, events and the shared error type
//! - [`spatial`]: the falloff curve and the ordered distance map
//! - [`audio`]: the source registry, the proximity mixer and the playback seam
//! - [`audio_io`]: cpal output and symphonia decoding behind that seam
//! - [`room`]: node store, focus tracking, sessions and the session handler
//! - [`network`]: the reconnecting upstream link
//! - [`settings`]: the TOML settings file

pub use audio;
pub use audio_io;
pub use network;
pub use room;
pub use room_core as types;
pub use settings_manager as settings;
pub use spatial;

pub use audio::{MuteSwitch, NullBackend, PlaybackBackend, ProximityMixer, SourceRegistry};
pub use room::{SessionCommand, SessionHandler, SpatialSession, VoiceNode};
pub use room_core::{AudioSource, Error, SessionEvent, SourceId};
pub use spatial::{DistanceMap, FalloffCurve};
