//! Configuration management for echofield
//!
//! This crate handles loading, validating and saving the settings file that
//! tunes the spatial mix, focus detection and the transport link.

use log::{debug, warn};
use room_core::{Error, TeardownPolicy};
use serde::{Deserialize, Serialize};
use spatial::{FalloffCurve, MAX_DISTANCE, MIN_DISTANCE};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Distance falloff and handle lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    /// Full volume within this distance
    pub min_distance: f32,
    /// Silent at and beyond this distance
    pub max_distance: f32,
    /// What to do with handles whose source disappeared
    pub teardown: TeardownPolicy,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            min_distance: MIN_DISTANCE,
            max_distance: MAX_DISTANCE,
            teardown: TeardownPolicy::Release,
        }
    }
}

impl MixerSettings {
    pub fn curve(&self) -> Result<FalloffCurve, Error> {
        FalloffCurve::new(self.min_distance, self.max_distance)
    }
}

/// Focus detection for the reply interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusSettings {
    /// A source within this distance can take focus
    pub threshold: f32,
    /// How long focus must be held before reply unlocks, in milliseconds
    pub dwell_ms: u64,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            threshold: 200.0,
            dwell_ms: 1500,
        }
    }
}

impl FocusSettings {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

/// Bounds for the proximity blur overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurSettings {
    pub near: f32,
    pub far: f32,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            near: 50.0,
            far: 400.0,
        }
    }
}

/// Reconnect behaviour of the transport link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub backoff_ms: u64,
    pub max_attempts: u32,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            backoff_ms: 3000,
            max_attempts: 5,
        }
    }
}

impl LinkSettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Preferred audio output device (empty string means system default)
    pub output_device: String,

    pub mixer: MixerSettings,
    pub focus: FocusSettings,
    pub blur: BlurSettings,
    pub link: LinkSettings,
}

impl Settings {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        let curve = self.mixer.curve()?;

        if !self.focus.threshold.is_finite() || self.focus.threshold <= 0.0 {
            return Err(Error::Config(format!(
                "focus.threshold must be a positive distance (got {})",
                self.focus.threshold
            )));
        }
        if self.focus.threshold <= curve.max_distance() {
            warn!(
                "focus.threshold ({}) is inside the audible range ({}); sources can go silent while focused",
                self.focus.threshold,
                curve.max_distance()
            );
        }

        if !(self.blur.near.is_finite() && self.blur.far.is_finite())
            || self.blur.near < 0.0
            || self.blur.far <= self.blur.near
        {
            return Err(Error::Config(format!(
                "blur.far ({}) must be greater than blur.near ({}) and both non-negative",
                self.blur.far, self.blur.near
            )));
        }

        if self.link.backoff_ms == 0 {
            return Err(Error::Config("link.backoff_ms must be positive".to_string()));
        }
        if self.link.max_attempts == 0 {
            return Err(Error::Config(
                "link.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Device name to open, `None` for the system default.
    pub fn output_device(&self) -> Option<&str> {
        if self.output_device.is_empty() {
            None
        } else {
            Some(&self.output_device)
        }
    }
}

/// Configuration manager
pub struct ConfigManager {
    settings: Settings,
    config_file: PathBuf,
}

impl ConfigManager {
    /// Load settings from the user's config directory, or defaults
    pub fn new() -> Result<Self, Error> {
        let mut config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Failed to determine config directory".to_string()))?;
        config_dir.push("echofield");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        Self::with_file(config_dir.join("settings.toml"))
    }

    /// Create a ConfigManager backed by a specific file
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config_file = path.as_ref().to_path_buf();
        let settings = if config_file.exists() {
            Self::load_from_file(&config_file)?
        } else {
            debug!("Config file {:?} not found, using defaults", config_file);
            Settings::default()
        };
        settings.validate()?;

        Ok(Self {
            settings,
            config_file,
        })
    }

    /// Load settings from a TOML file
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Settings, Error> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate and save settings to the config file
    pub fn save(&self) -> Result<(), Error> {
        self.settings.validate()?;
        let toml = toml::to_string_pretty(&self.settings)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.config_file.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        fs::write(&self.config_file, toml)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        debug!("Saved config to {:?}", self.config_file);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
