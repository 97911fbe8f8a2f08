//! # Library Configuration
//!
//! Describes how a [`Library`](crate::core::Library) context is brought up: which
//! native subsystems to initialise and which hints to apply before anything else
//! runs. Configurations can be written by hand or loaded from `.toml` / `.ron`
//! files through the [`Config`] trait.
//!
//! ```toml
//! [subsystems]
//! video = true
//! joystick = true
//!
//! [hints]
//! RENDER_VSYNC = "1"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sys::InitFlags;

// Re-export from the config module for convenience
pub use crate::config::{Config, ConfigError, ConfigFormat};

/// Native subsystems to initialise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemConfig {
    /// Timer subsystem
    pub timer: bool,
    /// Video subsystem (windows, renderers)
    pub video: bool,
    /// Joystick subsystem
    pub joystick: bool,
    /// Game controller subsystem, brings up joysticks too
    pub game_controller: bool,
    /// Event queue
    pub events: bool,
    /// Sensor subsystem
    pub sensor: bool,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            timer: true,
            video: true,
            joystick: false,
            game_controller: false,
            events: true,
            sensor: false,
        }
    }
}

impl SubsystemConfig {
    /// Every subsystem enabled
    pub const fn everything() -> Self {
        Self {
            timer: true,
            video: true,
            joystick: true,
            game_controller: true,
            events: true,
            sensor: true,
        }
    }

    /// Native flag set for these subsystems
    pub fn flags(&self) -> InitFlags {
        [
            (self.timer, InitFlags::TIMER),
            (self.video, InitFlags::VIDEO),
            (self.joystick, InitFlags::JOYSTICK),
            (self.game_controller, InitFlags::GAME_CONTROLLER),
            (self.events, InitFlags::EVENTS),
            (self.sensor, InitFlags::SENSOR),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(InitFlags::empty(), |flags, (_, flag)| flags | flag)
    }
}

/// Configuration applied when a library context is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Subsystems to initialise
    pub subsystems: SubsystemConfig,
    /// Hints applied with normal priority
    pub hints: BTreeMap<String, String>,
    /// Hints applied with override priority
    pub override_hints: BTreeMap<String, String>,
}

impl LibraryConfig {
    /// Create a configuration for the given subsystems
    pub fn new(subsystems: SubsystemConfig) -> Self {
        Self {
            subsystems,
            ..Self::default()
        }
    }

    /// Add a hint applied with normal priority
    pub fn with_hint(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.hints.insert(name.into(), value.into());
        self
    }

    /// Add a hint applied with override priority
    pub fn with_override_hint(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.override_hints.insert(name.into(), value.into());
        self
    }
}

impl Config for LibraryConfig {}
