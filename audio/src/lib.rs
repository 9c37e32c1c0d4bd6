//! Audio subsystem for echofield
//!
//! This crate owns the live side of the spatial mix: the registry of
//! looping playback handles and the proximity mixer that drives their gains
//! from the listener position. Platform output lives behind the
//! [`PlaybackBackend`] seam so the mix logic never touches a device.

mod backend;
mod mixer;
mod registry;

pub use backend::{MuteSwitch, NullBackend, PlaybackBackend, Voice};
pub use mixer::{ProximityMixer, TickChanges};
pub use registry::{PlaybackHandle, SourceRegistry};

#[cfg(test)]
pub(crate) mod testing;
