use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::DEFAULT_MAX_FRAMES;
use crate::recording::metadata::DEFAULT_GENERATED_BY;
use crate::recording::{RecordingOptions, DEFAULT_TIME_BETWEEN_LOOPS};

/// Engine configuration, persisted as JSON in the user config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capture ring capacity
    pub max_frames: usize,
    /// Default for play sessions started without explicit options
    pub loop_playback: bool,
    /// Delay used at the loop seam, in milliseconds
    pub time_between_loops_ms: u64,
    /// Let a live hand interrupt playback
    pub pause_on_hand: bool,
    /// End the capture when the ring completes its first lap
    pub finish_on_max_frames: bool,
    pub generated_by: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            loop_playback: true,
            time_between_loops_ms: DEFAULT_TIME_BETWEEN_LOOPS.as_millis() as u64,
            pause_on_hand: false,
            finish_on_max_frames: false,
            generated_by: DEFAULT_GENERATED_BY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("frame-spy").join("settings.json"))
    }

    /// Load the user's settings, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring settings at {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))?;
        debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().context("No config directory on this platform")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write settings file: {:?}", path))?;
        Ok(())
    }

    pub fn time_between_loops(&self) -> Duration {
        Duration::from_millis(self.time_between_loops_ms)
    }

    /// Options for recordings created by an engine with this configuration
    pub fn recording_options(&self) -> RecordingOptions {
        RecordingOptions {
            loop_playback: self.loop_playback,
            time_between_loops: self.time_between_loops(),
            generated_by: self.generated_by.clone(),
            ..RecordingOptions::default()
        }
    }
}
