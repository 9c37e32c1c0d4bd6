use crate::registry::SourceRegistry;
use log::{debug, warn};
use room_core::{AudioSource, Position, SourceId, TeardownPolicy};
use spatial::{DistanceMap, FalloffCurve};
use std::collections::HashSet;

/// Ids whose handles were created or released by the last recompute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickChanges {
    pub registered: Vec<SourceId>,
    pub released: Vec<SourceId>,
}

impl TickChanges {
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty() && self.released.is_empty()
    }
}

/// Drives per-source gains from the listener position.
///
/// Purely reactive: nothing happens between calls to [`recompute`], and the
/// result of a call depends only on its inputs, so replaying the same input
/// leaves gains and distances unchanged.
///
/// [`recompute`]: ProximityMixer::recompute
pub struct ProximityMixer {
    registry: SourceRegistry,
    curve: FalloffCurve,
    teardown: TeardownPolicy,
    distances: DistanceMap,
    /// Ids seen by the previous tick, in input order
    previous: Vec<SourceId>,
    changes: TickChanges,
}

impl ProximityMixer {
    pub fn new(registry: SourceRegistry, curve: FalloffCurve) -> Self {
        Self {
            registry,
            curve,
            teardown: TeardownPolicy::default(),
            distances: DistanceMap::new(),
            previous: Vec::new(),
            changes: TickChanges::default(),
        }
    }

    pub fn with_teardown(mut self, teardown: TeardownPolicy) -> Self {
        self.teardown = teardown;
        self
    }

    /// Recompute distances and gains for the listener at
    /// (`listener_x`, `listener_y`) against the full `sources` list.
    ///
    /// Every source is registered if needed, gets the falloff gain for its
    /// distance, and appears in the returned map in input order. Ids that
    /// were present last tick but are missing now are released (or silenced
    /// under [`TeardownPolicy::Retain`]).
    pub fn recompute(
        &mut self,
        listener_x: f32,
        listener_y: f32,
        sources: &[AudioSource],
    ) -> &DistanceMap {
        let listener = Position::new(listener_x, listener_y);
        let mut changes = TickChanges::default();

        let current: HashSet<&SourceId> = sources.iter().map(|s| &s.id).collect();
        for id in self.previous.iter().filter(|id| !current.contains(id)) {
            match self.teardown {
                TeardownPolicy::Release => {
                    if self.registry.unregister(id) {
                        changes.released.push(id.clone());
                    }
                }
                TeardownPolicy::Retain => self.registry.set_gain(id, 0.0),
            }
        }

        let mut distances = DistanceMap::with_capacity(sources.len());
        for source in sources {
            if self.registry.ensure_registered(source) {
                changes.registered.push(source.id.clone());
            }

            let mut distance = listener.distance_to(source.position());
            if !distance.is_finite() {
                warn!(
                    "Non-finite distance to {} (listener {:?}, source at {}, {}), treating as out of range",
                    source.id, listener, source.x, source.y
                );
                distance = f32::INFINITY;
            }

            self.registry.set_gain(&source.id, self.curve.gain(distance));
            distances.insert(source.id.clone(), distance);
        }

        debug!(
            "Recomputed mix for {} sources at ({}, {})",
            distances.len(),
            listener_x,
            listener_y
        );

        self.previous = distances.keys().cloned().collect();
        self.distances = distances;
        self.changes = changes;
        &self.distances
    }

    /// Distance map published by the last recompute.
    pub fn distances(&self) -> &DistanceMap {
        &self.distances
    }

    /// Handles created and released by the last recompute.
    pub fn last_changes(&self) -> &TickChanges {
        &self.changes
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockPlaybackBackend, MockVoice, MuteSwitch, Voice};
    use crate::testing::RecordingBackend;
    use room_core::Error;

    fn id(s: &str) -> SourceId {
        SourceId::new(s).unwrap()
    }

    fn source(name: &str, x: f32, y: f32) -> AudioSource {
        AudioSource::new(id(name), x, y, format!("blob:{}", name))
    }

    fn mixer() -> (ProximityMixer, RecordingBackend) {
        let backend = RecordingBackend::new();
        let registry = SourceRegistry::new(Box::new(backend.clone()), MuteSwitch::new());
        (ProximityMixer::new(registry, FalloffCurve::default()), backend)
    }

    #[test_log::test]
    fn distance_formula() {
        let (mut mixer, _) = mixer();
        let map = mixer.recompute(0.0, 0.0, &[source("a", 3.0, 4.0)]);
        assert_eq!(map.get(&id("a")), Some(5.0));
    }

    #[test_log::test]
    fn near_and_cutoff_scenario() {
        let (mut mixer, _) = mixer();
        let sources = [source("s1", 100.0, 100.0), source("s2", 250.0, 100.0)];
        let map = mixer.recompute(100.0, 100.0, &sources).clone();

        assert_eq!(map.get(&id("s1")), Some(0.0));
        assert_eq!(map.get(&id("s2")), Some(150.0));
        assert_eq!(mixer.registry().gain(&id("s1")), Some(1.0));
        assert_eq!(mixer.registry().gain(&id("s2")), Some(0.0));
    }

    #[test_log::test]
    fn moving_listener_symmetry() {
        let (mut mixer, _) = mixer();
        let sources = [source("s", 50.0, 0.0)];
        let expected = 1.0 - (50.0 - 20.0) / 130.0;

        mixer.recompute(0.0, 0.0, &sources);
        let first = mixer.registry().gain(&id("s")).unwrap();
        assert!((first - expected).abs() < 1e-6);

        mixer.recompute(100.0, 0.0, &sources);
        let second = mixer.registry().gain(&id("s")).unwrap();
        assert!((second - expected).abs() < 1e-6);
        assert_eq!(mixer.distances().get(&id("s")), Some(50.0));
    }

    #[test_log::test]
    fn map_has_exactly_current_keys_in_order() {
        let (mut mixer, _) = mixer();
        let sources = [
            source("c", 1.0, 0.0),
            source("a", 2.0, 0.0),
            source("b", 3.0, 0.0),
        ];
        let map = mixer.recompute(0.0, 0.0, &sources);
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);

        let map = mixer.recompute(0.0, 0.0, &sources[1..]);
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test_log::test]
    fn recompute_is_idempotent() {
        let (mut mixer, backend) = mixer();
        let sources = [source("a", 30.0, 40.0), source("b", 120.0, 0.0)];

        let first = mixer.recompute(10.0, 10.0, &sources).clone();
        let gains_first: Vec<Option<f32>> =
            sources.iter().map(|s| mixer.registry().gain(&s.id)).collect();

        let second = mixer.recompute(10.0, 10.0, &sources).clone();
        let gains_second: Vec<Option<f32>> =
            sources.iter().map(|s| mixer.registry().gain(&s.id)).collect();

        assert_eq!(first, second);
        assert_eq!(gains_first, gains_second);
        assert_eq!(backend.opened().len(), 2);
        assert!(mixer.last_changes().is_empty());
    }

    #[test_log::test]
    fn dropped_source_is_released() {
        let (mut mixer, backend) = mixer();
        mixer.recompute(0.0, 0.0, &[source("a", 0.0, 0.0), source("b", 10.0, 0.0)]);
        assert_eq!(mixer.last_changes().registered, vec![id("a"), id("b")]);

        mixer.recompute(0.0, 0.0, &[source("b", 10.0, 0.0)]);
        assert_eq!(mixer.last_changes().released, vec![id("a")]);
        assert!(!mixer.registry().contains(&id("a")));
        assert_eq!(backend.dropped(), vec![0]);

        // Coming back opens a fresh stream
        mixer.recompute(0.0, 0.0, &[source("a", 0.0, 0.0), source("b", 10.0, 0.0)]);
        assert_eq!(mixer.last_changes().registered, vec![id("a")]);
        assert_eq!(backend.opened().len(), 3);
    }

    #[test_log::test]
    fn retain_policy_silences_instead_of_releasing() {
        let (mixer, backend) = mixer();
        let mut mixer = mixer.with_teardown(TeardownPolicy::Retain);

        mixer.recompute(0.0, 0.0, &[source("a", 0.0, 0.0)]);
        assert_eq!(mixer.registry().gain(&id("a")), Some(1.0));

        mixer.recompute(0.0, 0.0, &[]);
        assert!(mixer.registry().contains(&id("a")));
        assert_eq!(mixer.registry().gain(&id("a")), Some(0.0));
        assert!(backend.dropped().is_empty());
        assert!(mixer.distances().is_empty());
    }

    #[test_log::test]
    fn malformed_coordinates_stay_silent() {
        let (mut mixer, _) = mixer();
        let sources = [source("bad", f32::NAN, 0.0), source("ok", 0.0, 0.0)];
        let map = mixer.recompute(0.0, 0.0, &sources).clone();

        assert_eq!(map.get(&id("bad")), Some(f32::INFINITY));
        assert_eq!(mixer.registry().gain(&id("bad")), Some(0.0));
        assert_eq!(mixer.registry().gain(&id("ok")), Some(1.0));
    }

    #[test_log::test]
    fn failed_source_leaves_others_untouched() {
        let mut backend = MockPlaybackBackend::new();
        backend
            .expect_open()
            .withf(|src| src == "blob:broken")
            .times(1)
            .returning(|_| Err(Error::Audio("decode failed".to_string())));
        backend
            .expect_open()
            .withf(|src| src == "blob:healthy")
            .times(1)
            .returning(|_| {
                let mut voice = MockVoice::new();
                voice.expect_set_gain().return_const(());
                Ok(Box::new(voice) as Box<dyn Voice>)
            });

        let registry = SourceRegistry::new(Box::new(backend), MuteSwitch::new());
        let mut mixer = ProximityMixer::new(registry, FalloffCurve::default());
        let sources = [source("broken", 10.0, 0.0), source("healthy", 50.0, 0.0)];

        let map = mixer.recompute(0.0, 0.0, &sources).clone();
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["broken", "healthy"]);
        assert_eq!(map.get(&id("broken")), Some(10.0));
        assert_eq!(map.get(&id("healthy")), Some(50.0));

        let healthy = mixer.registry().get(&id("healthy")).unwrap();
        assert!(healthy.is_live());
        assert!((healthy.gain() - (1.0 - 30.0 / 130.0)).abs() < 1e-6);

        let broken = mixer.registry().get(&id("broken")).unwrap();
        assert!(!broken.is_live());
        assert_eq!(broken.gain(), 1.0);

        // The failed id is not reopened and the healthy voice keeps tracking
        mixer.recompute(30.0, 0.0, &sources);
        assert_eq!(mixer.registry().gain(&id("healthy")), Some(1.0));
        assert_eq!(mixer.registry().gain(&id("broken")), Some(1.0));
    }

    #[test_log::test]
    fn src_change_keeps_original_binding() {
        let (mut mixer, backend) = mixer();
        let mut reply = source("reply", 0.0, 0.0);
        mixer.recompute(0.0, 0.0, std::slice::from_ref(&reply));

        reply.src = "blob:fresh".to_string();
        mixer.recompute(0.0, 0.0, std::slice::from_ref(&reply));

        assert_eq!(mixer.registry().src(&id("reply")), Some("blob:reply"));
        assert_eq!(backend.opened(), vec!["blob:reply".to_string()]);
    }
}
