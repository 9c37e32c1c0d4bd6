use crate::backend::{MuteSwitch, PlaybackBackend, Voice};
use log::{debug, info, warn};
use room_core::{AudioSource, SourceId};
use std::collections::HashMap;

/// A registered source's playback state.
pub struct PlaybackHandle {
    /// URI the stream was opened with. Fixed for the life of the handle.
    src: String,
    /// Tracked gain, independent of the global mute
    gain: f32,
    /// `None` when the backend refused the stream; the handle stays silent
    voice: Option<Box<dyn Voice>>,
}

impl PlaybackHandle {
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Whether the backend actually has a stream behind this handle.
    pub fn is_live(&self) -> bool {
        self.voice.is_some()
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("src", &self.src)
            .field("gain", &self.gain)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Exactly one looping playback handle per source id.
///
/// Registration is idempotent: a known id is never reopened, and its bound
/// URI is not updated even if the source later reports a different `src`.
/// Sources that change audio need a new id.
pub struct SourceRegistry {
    backend: Box<dyn PlaybackBackend>,
    handles: HashMap<SourceId, PlaybackHandle>,
    mute: MuteSwitch,
}

impl SourceRegistry {
    pub fn new(backend: Box<dyn PlaybackBackend>, mute: MuteSwitch) -> Self {
        Self {
            backend,
            handles: HashMap::new(),
            mute,
        }
    }

    /// Open a stream for `source` unless its id is already registered.
    ///
    /// Returns `true` when a new handle was created. A backend failure is
    /// logged and recorded as a silent handle so the id is not retried on
    /// every tick.
    pub fn ensure_registered(&mut self, source: &AudioSource) -> bool {
        if let Some(existing) = self.handles.get(&source.id) {
            if existing.src != source.src {
                debug!(
                    "Source {} now reports {}, keeping original binding {}",
                    source.id, source.src, existing.src
                );
            }
            return false;
        }

        let voice = match self.backend.open(&source.src) {
            Ok(mut voice) => {
                voice.set_gain(0.0);
                Some(voice)
            }
            Err(e) => {
                warn!("Playback for {} unavailable, it will stay silent: {}", source.id, e);
                None
            }
        };

        info!("Registered source {} ({})", source.id, source.src);
        self.handles.insert(
            source.id.clone(),
            PlaybackHandle {
                src: source.src.clone(),
                gain: 0.0,
                voice,
            },
        );
        true
    }

    /// Update the tracked gain of `id`, clamped to `[0.0, 1.0]`.
    ///
    /// Unknown ids are ignored.
    pub fn set_gain(&mut self, id: &SourceId, gain: f32) {
        let Some(handle) = self.handles.get_mut(id) else {
            return;
        };
        let gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
        handle.gain = gain;
        if let Some(voice) = handle.voice.as_mut() {
            voice.set_gain(gain);
        }
    }

    /// Drop the handle for `id`, releasing its platform stream.
    ///
    /// Returns whether a handle existed.
    pub fn unregister(&mut self, id: &SourceId) -> bool {
        match self.handles.remove(id) {
            Some(handle) => {
                info!("Released source {} ({})", id, handle.src);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &SourceId) -> Option<&PlaybackHandle> {
        self.handles.get(id)
    }

    pub fn contains(&self, id: &SourceId) -> bool {
        self.handles.contains_key(id)
    }

    pub fn gain(&self, id: &SourceId) -> Option<f32> {
        self.handles.get(id).map(PlaybackHandle::gain)
    }

    pub fn src(&self, id: &SourceId) -> Option<&str> {
        self.handles.get(id).map(PlaybackHandle::src)
    }

    /// Gain actually heard, taking the global mute into account.
    pub fn effective_gain(&self, id: &SourceId) -> Option<f32> {
        let gain = self.gain(id)?;
        Some(if self.mute.is_muted() { 0.0 } else { gain })
    }

    pub fn ids(&self) -> impl Iterator<Item = &SourceId> + '_ {
        self.handles.keys()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn mute_switch(&self) -> &MuteSwitch {
        &self.mute
    }
}
