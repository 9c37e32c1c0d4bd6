//! Spatial math for echofield
//!
//! This crate holds the pure parts of the proximity mix: the distance to
//! gain falloff curve and the ordered distance map published every tick.

mod distance;
mod falloff;

pub use distance::DistanceMap;
pub use falloff::{FalloffCurve, MAX_DISTANCE, MIN_DISTANCE};
