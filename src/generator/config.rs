//! Track generator configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::core::RandomizerConfig;
use crate::sequence::LevelIteration;

/// Floating origin settings
///
/// When the viewer moves further than `distance` from the origin on any
/// enabled axis, the whole track is shifted back so the viewer sits at the
/// origin on those axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginResetConfig {
    pub distance: f32,
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Default for OriginResetConfig {
    fn default() -> Self {
        Self {
            distance: 999.0,
            x: true,
            y: true,
            z: true,
        }
    }
}

/// Configuration for the track generator
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Segments kept ahead of the entered one
    pub generate_ahead: usize,
    /// Segments activated ahead of the entered one
    pub activate_ahead: usize,
    /// Window size; the oldest segment is destroyed beyond it
    pub max_segments: usize,
    /// Seconds to wait for a remote level before skipping a creation
    pub load_timeout: f32,
    /// Seconds to wait for activation builders
    pub builder_timeout: f32,
    /// Run the numeric extrusion on a worker thread
    pub multithreaded: bool,
    /// Close the segment list into a loop and never clean up
    pub loop_segments: bool,
    pub start_level: usize,
    pub level_iteration: LevelIteration,
    pub level_randomizer: RandomizerConfig,
    pub generation_randomizer: RandomizerConfig,
    pub origin_reset: Option<OriginResetConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            generate_ahead: 5,
            activate_ahead: 1,
            max_segments: 10,
            load_timeout: 10.0,
            builder_timeout: 10.0,
            multithreaded: true,
            loop_segments: false,
            start_level: 0,
            level_iteration: LevelIteration::OrderedFinite,
            level_randomizer: RandomizerConfig::TimeBased,
            generation_randomizer: RandomizerConfig::TimeBased,
            origin_reset: None,
        }
    }
}

impl GeneratorConfig {
    /// Copy with the window sizes clamped into a consistent range
    pub fn validated(&self) -> Self {
        let mut config = self.clone();
        config.generate_ahead = config.generate_ahead.max(1);
        config.activate_ahead = config.activate_ahead.clamp(1, config.generate_ahead);
        config.max_segments = config.max_segments.max(config.generate_ahead + 1);
        config.load_timeout = config.load_timeout.max(0.0);
        config.builder_timeout = config.builder_timeout.max(0.0);
        config
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: GeneratorConfig = serde_json::from_str(&json)?;
        Ok(config.validated())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}
