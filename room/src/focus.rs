use room_core::{SessionEvent, SourceId};
use spatial::DistanceMap;
use std::time::{Duration, Instant};

/// The source the listener is focused on, if any.
///
/// Ties go to the first source in map order that is within `threshold`.
pub fn focused_source(distances: &DistanceMap, threshold: f32) -> Option<&SourceId> {
    distances.first_within(threshold)
}

/// Blur intensity in `[0.0, 1.0]` from the nearest source distance.
///
/// 0.0 when the nearest source is within `near`, 1.0 at `far` or beyond, and
/// 1.0 when there are no sources at all.
pub fn blur_level(distances: &DistanceMap, near: f32, far: f32) -> f32 {
    match distances.min_distance() {
        Some(d) if far > near => (d.clamp(near, far) - near) / (far - near),
        Some(d) => {
            if d <= near {
                0.0
            } else {
                1.0
            }
        }
        None => 1.0,
    }
}

/// Tracks which source holds focus and for how long.
///
/// Reply unlocks once per focus: moving to another source (or out of range)
/// starts the dwell over.
#[derive(Debug, Clone)]
pub struct FocusTracker {
    threshold: f32,
    dwell: Duration,
    current: Option<(SourceId, Instant)>,
    unlocked: bool,
}

impl FocusTracker {
    pub fn new(threshold: f32, dwell: Duration) -> Self {
        Self {
            threshold,
            dwell,
            current: None,
            unlocked: false,
        }
    }

    pub fn focused(&self) -> Option<&SourceId> {
        self.current.as_ref().map(|(id, _)| id)
    }

    /// Whether reply is available for the current focus.
    pub fn reply_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Re-evaluate focus against fresh distances at time `now`.
    pub fn update(&mut self, distances: &DistanceMap, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let candidate = focused_source(distances, self.threshold);

        if candidate != self.focused() {
            self.current = candidate.map(|id| (id.clone(), now));
            self.unlocked = false;
            events.push(SessionEvent::FocusChanged(candidate.cloned()));
        }

        if let Some((id, since)) = &self.current {
            if !self.unlocked && now.saturating_duration_since(*since) >= self.dwell {
                self.unlocked = true;
                events.push(SessionEvent::ReplyUnlocked(id.clone()));
            }
        }

        events
    }
}
