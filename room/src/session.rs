use crate::focus::{blur_level, FocusTracker};
use crate::store::{NodeStore, VoiceNode};
use audio::{MuteSwitch, PlaybackBackend, ProximityMixer, SourceRegistry};
use log::{debug, info};
use room_core::{Error, Position, SessionEvent, SourceId};
use settings_manager::{BlurSettings, Settings};
use spatial::DistanceMap;
use std::time::Instant;

/// Point-in-time view of a session, for logging and UIs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub listener: Position,
    pub nodes: Vec<VoiceNode>,
    pub distances: DistanceMap,
    /// Tracked gain per source, in distance map order
    pub gains: Vec<(SourceId, f32)>,
    pub focused: Option<SourceId>,
    pub reply_unlocked: bool,
    pub blur: f32,
    pub muted: bool,
}

/// Everything one listener's spatial mix needs, in one place.
///
/// Each mutation runs a full recompute against the current node list and
/// returns the events it produced, in order: released handles, registered
/// handles, then focus changes.
pub struct SpatialSession {
    store: NodeStore,
    mixer: ProximityMixer,
    listener: Position,
    focus: FocusTracker,
    blur: BlurSettings,
}

impl SpatialSession {
    pub fn new(
        backend: Box<dyn PlaybackBackend>,
        mute: MuteSwitch,
        settings: &Settings,
    ) -> Result<Self, Error> {
        settings.validate()?;

        let registry = SourceRegistry::new(backend, mute);
        let mixer = ProximityMixer::new(registry, settings.mixer.curve()?)
            .with_teardown(settings.mixer.teardown);

        Ok(Self {
            store: NodeStore::new(),
            mixer,
            listener: Position::default(),
            focus: FocusTracker::new(settings.focus.threshold, settings.focus.dwell()),
            blur: settings.blur.clone(),
        })
    }

    pub fn move_listener(&mut self, x: f32, y: f32, now: Instant) -> Vec<SessionEvent> {
        self.listener = Position::new(x, y);
        self.tick(now)
    }

    pub fn replace_nodes(&mut self, nodes: Vec<VoiceNode>, now: Instant) -> Vec<SessionEvent> {
        self.store.replace_all(nodes);
        self.tick(now)
    }

    pub fn upsert_node(&mut self, node: VoiceNode, now: Instant) -> Vec<SessionEvent> {
        self.store.upsert(node);
        self.tick(now)
    }

    /// Remove a node. Unknown ids leave the mix untouched and produce no events.
    pub fn remove_node(&mut self, id: &SourceId, now: Instant) -> Vec<SessionEvent> {
        if self.store.remove(id).is_none() {
            debug!("Ignoring removal of unknown node {}", id);
            return Vec::new();
        }
        self.tick(now)
    }

    /// Reply to `parent` with freshly recorded audio.
    ///
    /// Only allowed once the listener has dwelt on `parent` long enough.
    pub fn add_reply(
        &mut self,
        parent: &SourceId,
        audio_url: impl Into<String>,
        now: Instant,
    ) -> Result<(SourceId, Vec<SessionEvent>), Error> {
        if self.focus.focused() != Some(parent) || !self.focus.reply_unlocked() {
            return Err(Error::Session(format!("reply to {} is locked", parent)));
        }

        let id = self.store.add_reply(parent, audio_url)?;
        info!("Added reply {} to {}", id, parent);
        Ok((id, self.tick(now)))
    }

    /// Re-evaluate focus without touching the mix, so dwell can elapse while
    /// the listener stands still.
    pub fn poll_focus(&mut self, now: Instant) -> Vec<SessionEvent> {
        self.focus.update(self.mixer.distances(), now)
    }

    /// Returns the event to report if the mute state actually changed.
    pub fn set_muted(&mut self, muted: bool) -> Option<SessionEvent> {
        let previous = self.mixer.registry().mute_switch().set(muted);
        if previous == muted {
            return None;
        }
        info!("Output {}", if muted { "muted" } else { "unmuted" });
        Some(SessionEvent::MuteChanged(muted))
    }

    pub fn is_muted(&self) -> bool {
        self.mixer.registry().mute_switch().is_muted()
    }

    pub fn distances(&self) -> &DistanceMap {
        self.mixer.distances()
    }

    pub fn focused(&self) -> Option<&SourceId> {
        self.focus.focused()
    }

    pub fn reply_unlocked(&self) -> bool {
        self.focus.reply_unlocked()
    }

    pub fn blur_level(&self) -> f32 {
        blur_level(self.mixer.distances(), self.blur.near, self.blur.far)
    }

    pub fn listener(&self) -> Position {
        self.listener
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.mixer.registry()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let registry = self.mixer.registry();
        let distances = self.mixer.distances().clone();
        let gains = distances
            .keys()
            .filter_map(|id| registry.gain(id).map(|gain| (id.clone(), gain)))
            .collect();

        SessionSnapshot {
            listener: self.listener,
            nodes: self.store.iter().cloned().collect(),
            distances,
            gains,
            focused: self.focus.focused().cloned(),
            reply_unlocked: self.focus.reply_unlocked(),
            blur: self.blur_level(),
            muted: self.is_muted(),
        }
    }

    fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let sources = self.store.sources();
        self.mixer.recompute(self.listener.x, self.listener.y, &sources);

        let changes = self.mixer.last_changes();
        let mut events: Vec<SessionEvent> = changes
            .released
            .iter()
            .cloned()
            .map(SessionEvent::SourceReleased)
            .chain(
                changes
                    .registered
                    .iter()
                    .cloned()
                    .map(SessionEvent::SourceRegistered),
            )
            .collect();

        events.extend(self.focus.update(self.mixer.distances(), now));
        events
    }
}
