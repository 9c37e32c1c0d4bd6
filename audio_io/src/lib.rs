//! Audio output for echofield
//!
//! This crate interfaces with audio hardware using cpal and decodes source
//! files with symphonia. It provides [`CpalBackend`], the platform
//! implementation of `audio::PlaybackBackend`.

mod clip;
mod device;
mod output;

pub use clip::{resolve_local_path, Clip};
pub use device::list_output_devices;
pub use output::CpalBackend;
