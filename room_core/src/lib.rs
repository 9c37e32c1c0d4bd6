//! Shared types for echofield.
//!
//! Everything that more than one crate in the workspace needs lives here:
//! source identity, positions, the unified error type and session events.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable identifier of an audio source on the canvas.
///
/// Never empty. The registry and the distance map are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidSource("source id must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SourceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point on the 2D canvas, in pixel/world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Position) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// One looping audio emitter as the mixer sees it.
///
/// `src` is an opaque locator; only the playback backend interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: SourceId,
    pub x: f32,
    pub y: f32,
    pub src: String,
}

impl AudioSource {
    pub fn new(id: SourceId, x: f32, y: f32, src: impl Into<String>) -> Self {
        Self {
            id,
            x,
            y,
            src: src.into(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// What happens to a playback handle once its source leaves the source list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownPolicy {
    /// Release the platform stream as soon as the id disappears
    #[default]
    Release,
    /// Keep the handle (silenced) for the life of the registry
    Retain,
}

/// Unified error type for the workspace.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub mod events;

pub use events::SessionEvent;
