//! Configuration — engine timing options and player settings from ~/.beatblocks/config.yaml.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::judge::TierThresholds;

/// Timing options recognised by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum deviation (seconds) before a beat is swept as missed.
    pub hit_window: f64,
    pub tier_thresholds: TierThresholds,
    /// How far ahead of the audio clock cues are submitted (seconds).
    pub schedule_ahead_window: f64,
    /// Period of the lookahead pass (milliseconds).
    pub lookahead_tick_ms: u64,
    /// Judge every pip on schedule instead of waiting for input.
    pub auto_listen: bool,
    /// Most schedule entries the visual cursor walks per frame.
    pub max_frame_batch: usize,
    /// Metronome count-in before the first pip.
    pub countdown_beats: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hit_window: 0.12,
            tier_thresholds: TierThresholds::default(),
            schedule_ahead_window: 0.1,
            lookahead_tick_ms: 25,
            auto_listen: false,
            max_frame_batch: 30,
            countdown_beats: 4,
        }
    }
}

impl EngineConfig {
    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.hit_window.is_finite() && self.hit_window > 0.0) {
            return Err(EngineError::Config(format!(
                "hit_window must be positive, got {}",
                self.hit_window
            )));
        }
        if !self.tier_thresholds.is_ascending() {
            return Err(EngineError::Config(format!(
                "tier thresholds must be positive and ascending, got {:?}",
                self.tier_thresholds
            )));
        }
        if !(self.schedule_ahead_window.is_finite() && self.schedule_ahead_window > 0.0) {
            return Err(EngineError::Config(format!(
                "schedule_ahead_window must be positive, got {}",
                self.schedule_ahead_window
            )));
        }
        if self.lookahead_tick_ms == 0 || self.max_frame_batch == 0 {
            return Err(EngineError::Config(
                "lookahead_tick_ms and max_frame_batch must be non-zero".into(),
            ));
        }
        if (self.hit_window - self.tier_thresholds.ok).abs() > f64::EPSILON {
            log::warn!(
                "hit_window {} differs from the ok threshold {}",
                self.hit_window,
                self.tier_thresholds.ok
            );
        }
        Ok(())
    }
}

/// Player settings that affect playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Input latency compensation in milliseconds.
    pub offset_ms: f64,
    /// Metronome volume, 50 = unity.
    pub metronome_volume: f32,
    /// Hit sound volume, 50 = unity.
    pub hitsound_volume: f32,
    /// Play the hit sound when a key is pressed instead of on schedule.
    pub play_hitsounds_on_hit: bool,
    pub metronome_enabled: bool,
    /// Keys that register a hit.
    pub keybinds: Vec<String>,
    /// Show the signed deviation instead of the tier name.
    pub show_offset: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            offset_ms: 0.0,
            metronome_volume: 50.0,
            hitsound_volume: 70.0,
            play_hitsounds_on_hit: false,
            metronome_enabled: true,
            keybinds: vec!["f".into(), "j".into(), "Space".into()],
            show_offset: false,
        }
    }
}

impl Settings {
    /// Offset in seconds.
    pub fn offset_secs(&self) -> f64 {
        self.offset_ms / 1000.0
    }

    /// Metronome gain with 50 mapped to 1.0.
    pub fn metronome_gain(&self) -> f32 {
        self.metronome_volume / 50.0
    }

    /// Hit sound gain with 50 mapped to 1.0.
    pub fn hitsound_gain(&self) -> f32 {
        self.hitsound_volume / 50.0
    }
}

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub settings: Settings,
}

/// Default config path (~/.beatblocks/config.yaml).
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".beatblocks");
    path.push("config.yaml");
    path
}

impl AppConfig {
    /// Load from `path`. A missing or unreadable file falls back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self).map_err(|e| EngineError::Config(e.to_string()))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}
