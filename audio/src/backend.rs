use room_core::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Creates looping playback streams on some output.
///
/// `open` must not block on audio I/O: it starts playback (or schedules it)
/// and returns. Failures that only surface later are the backend's to log.
#[cfg_attr(test, mockall::automock)]
pub trait PlaybackBackend: Send {
    /// Start a looping, autoplaying stream for `src`.
    fn open(&mut self, src: &str) -> Result<Box<dyn Voice>, Error>;
}

/// One live stream created by a [`PlaybackBackend`].
///
/// Dropping the voice releases the underlying platform resource.
#[cfg_attr(test, mockall::automock)]
pub trait Voice: Send {
    /// Set the linear output gain, already clamped to `[0.0, 1.0]`.
    fn set_gain(&mut self, gain: f32);
}

/// Process-wide output mute.
///
/// Cloning shares the flag. Backends read it when producing output; tracked
/// per-source gains are never touched, so unmuting restores the mix as it was.
#[derive(Debug, Clone, Default)]
pub struct MuteSwitch(Arc<AtomicBool>);

impl MuteSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_muted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag and return its previous value.
    pub fn set(&self, muted: bool) -> bool {
        self.0.swap(muted, Ordering::AcqRel)
    }

    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }
}

/// Backend that accepts every source and produces no sound.
///
/// Used when no output device is available so the rest of the session keeps
/// working.
#[derive(Debug, Default)]
pub struct NullBackend;

struct SilentVoice;

impl Voice for SilentVoice {
    fn set_gain(&mut self, _gain: f32) {}
}

impl PlaybackBackend for NullBackend {
    fn open(&mut self, _src: &str) -> Result<Box<dyn Voice>, Error> {
        Ok(Box::new(SilentVoice))
    }
}
