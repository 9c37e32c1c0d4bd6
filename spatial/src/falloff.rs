use log::debug;
use room_core::Error;

/// Distance below which a source plays at full volume.
pub const MIN_DISTANCE: f32 = 20.0;

/// Distance at and beyond which a source is silent.
pub const MAX_DISTANCE: f32 = 150.0;

/// Linear distance-to-gain rolloff with a full-volume dead zone.
///
/// ```text
/// gain(d) = clamp(1 - max(0, d - min) / (max - min), 0, 1)
/// ```
///
/// The dead zone keeps jitter at point-blank range from modulating the
/// volume. Bounds are validated once, at construction, so `gain` itself
/// never fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FalloffCurve {
    min_distance: f32,
    max_distance: f32,
}

impl FalloffCurve {
    /// Create a curve, rejecting bounds that would make the slope undefined.
    pub fn new(min_distance: f32, max_distance: f32) -> Result<Self, Error> {
        if !min_distance.is_finite() || !max_distance.is_finite() {
            return Err(Error::Config(format!(
                "falloff bounds must be finite (min={}, max={})",
                min_distance, max_distance
            )));
        }
        if min_distance < 0.0 {
            return Err(Error::Config(format!(
                "min_distance must not be negative (got {})",
                min_distance
            )));
        }
        if max_distance <= min_distance {
            return Err(Error::Config(format!(
                "max_distance ({}) must be greater than min_distance ({})",
                max_distance, min_distance
            )));
        }

        debug!(
            "Falloff curve configured: full volume within {}, silent beyond {}",
            min_distance, max_distance
        );
        Ok(Self {
            min_distance,
            max_distance,
        })
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// Gain in `[0.0, 1.0]` for a listener `distance` away from a source.
    ///
    /// NaN distances map to silence.
    pub fn gain(&self, distance: f32) -> f32 {
        if distance.is_nan() {
            return 0.0;
        }
        let excess = (distance - self.min_distance).max(0.0);
        let span = self.max_distance - self.min_distance;
        (1.0 - excess / span).clamp(0.0, 1.0)
    }
}

impl Default for FalloffCurve {
    fn default() -> Self {
        Self {
            min_distance: MIN_DISTANCE,
            max_distance: MAX_DISTANCE,
        }
    }
}
