//! Song file — JSON load/save of a chart and its song metadata.
//!
//! The on-disk shape is the `.mjson` format: `bpm`, `dicePattern`, `title`,
//! `songPath` and `maxDiceVisible`, with an optional top-level `startPos`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Chart;
use crate::error::EngineError;

fn default_bpm() -> f64 {
    120.0
}

fn default_max_dice_visible() -> u32 {
    16
}

/// A chart together with the metadata it is saved with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongFile {
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    #[serde(flatten)]
    pub chart: Chart,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub song_path: String,
    #[serde(default = "default_max_dice_visible")]
    pub max_dice_visible: u32,
}

impl SongFile {
    pub fn new(title: impl Into<String>, bpm: f64, chart: Chart) -> Self {
        Self {
            bpm,
            chart,
            title: title.into(),
            song_path: String::new(),
            max_dice_visible: default_max_dice_visible(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Block to start playback from: `requested` if given, else the file's `startPos`.
    pub fn playback_start(&self, requested: Option<usize>) -> usize {
        requested.or(self.chart.start_pos).unwrap_or(0)
    }

    /// Load a song file from disk.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        let song = Self::from_json(&content)?;
        log::info!(
            "loaded chart {:?} ({} blocks, {} bpm)",
            song.title,
            song.chart.len(),
            song.bpm
        );
        Ok(song)
    }

    /// Save a song file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl Default for SongFile {
    fn default() -> Self {
        Self::new("Beat Blocks", default_bpm(), Chart::default_chart())
    }
}
