//! Chart data model — an ordered sequence of beat blocks.
//!
//! A [`Block`] expands into 1–6 evenly spaced pips within one beat. Each pip
//! has a sound flag (`0` = silent subdivision). A block may change the tempo
//! from its first pip onward, and may be flagged `auto` so it judges itself.

pub mod file;
pub mod pips;

pub use file::SongFile;
pub use pips::{pip_count, pip_order, MAX_VALUE, MIN_VALUE, PIP_ORDER};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EngineError;

/// One chart entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Number of pips, 1–6.
    #[serde(deserialize_with = "lenient_u8")]
    pub value: u8,
    /// One flag per pip in traversal order; `0` is silent.
    #[serde(rename = "soundMap", default, deserialize_with = "lenient_flags")]
    pub sound_map: Vec<u8>,
    /// Tempo applied from this block's first pip onward.
    #[serde(rename = "bpmChange", default, skip_serializing_if = "Option::is_none")]
    pub bpm_change: Option<f64>,
    /// Judge this block's pips on schedule without player input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,
}

/// Saturate any JSON number into `u8` so out-of-range values reach
/// [`Chart::normalise`] instead of failing the whole file.
fn lenient_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    Ok(saturate_u8(raw))
}

fn lenient_flags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let raw = Vec::<f64>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(saturate_u8).collect())
}

fn saturate_u8(raw: f64) -> u8 {
    if raw.is_nan() {
        0
    } else {
        raw.clamp(0.0, u8::MAX as f64) as u8
    }
}

impl Block {
    /// A fully audible block with `value` pips.
    pub fn new(value: u8) -> Self {
        let value = pips::clamp_value(value);
        Self {
            value,
            sound_map: vec![1; value as usize],
            bpm_change: None,
            auto: None,
        }
    }

    /// A block with an explicit sound map.
    pub fn with_sound_map(value: u8, sound_map: Vec<u8>) -> Self {
        Self {
            value,
            sound_map,
            bpm_change: None,
            auto: None,
        }
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm_change = Some(bpm);
        self
    }

    pub fn auto(mut self) -> Self {
        self.auto = Some(true);
        self
    }

    pub fn is_auto(&self) -> bool {
        self.auto == Some(true)
    }

    /// The value used for expansion (clamped into 1–6).
    pub fn effective_value(&self) -> u8 {
        pips::clamp_value(self.value)
    }

    /// Whether the sound map matches the pip count.
    pub fn sound_map_is_valid(&self) -> bool {
        self.value == self.effective_value() && self.sound_map.len() == self.value as usize
    }

    /// Sound flag (0 or 1) of the `step`-th pip in traversal order.
    ///
    /// A mismatched sound map reads as fully audible.
    pub fn volume_at(&self, step: usize) -> u8 {
        if !self.sound_map_is_valid() {
            return 1;
        }
        match self.sound_map.get(step) {
            Some(0) => 0,
            _ => 1,
        }
    }

    /// Tempo change, if it is usable.
    pub fn valid_bpm_change(&self) -> Option<f64> {
        self.bpm_change.filter(|bpm| bpm.is_finite() && *bpm > 0.0)
    }
}

/// An ordered sequence of blocks plus the block playback audibly starts from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(rename = "dicePattern", default)]
    pub blocks: Vec<Block>,
    #[serde(rename = "startPos", default, skip_serializing_if = "Option::is_none")]
    pub start_pos: Option<usize>,
}

impl Chart {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            start_pos: None,
        }
    }

    /// A short four-bar pattern used when no chart file is given.
    pub fn default_chart() -> Self {
        let mut blocks = Vec::new();
        for bar in 0..4u8 {
            blocks.push(Block::new(1));
            blocks.push(Block::new(2));
            blocks.push(Block::with_sound_map(3, vec![1, 0, 1]));
            blocks.push(Block::new(if bar % 2 == 0 { 4 } else { 2 }));
        }
        Self::new(blocks)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// The designated start block, if it exists in the chart.
    pub fn start_block(&self) -> Option<usize> {
        self.start_pos.filter(|&pos| pos < self.blocks.len())
    }

    /// Repair malformed blocks in place.
    ///
    /// Values outside 1–6 are clamped, sound maps of the wrong length are
    /// replaced with a fully audible map, and unusable tempo changes are
    /// dropped. Returns one [`EngineError::MalformedChart`] per repair.
    pub fn normalise(&mut self) -> Vec<EngineError> {
        let mut repairs = Vec::new();
        for (index, block) in self.blocks.iter_mut().enumerate() {
            let value = block.effective_value();
            if value != block.value {
                repairs.push(EngineError::MalformedChart {
                    block: index,
                    reason: format!("value {} clamped to {value}", block.value),
                });
                block.value = value;
            }
            if block.sound_map.len() != value as usize {
                repairs.push(EngineError::MalformedChart {
                    block: index,
                    reason: format!(
                        "sound map has {} flags, expected {value}",
                        block.sound_map.len()
                    ),
                });
                block.sound_map = vec![1; value as usize];
            }
            for flag in block.sound_map.iter_mut().filter(|f| **f > 1) {
                *flag = 1;
            }
            if block.bpm_change.is_some() && block.valid_bpm_change().is_none() {
                repairs.push(EngineError::MalformedChart {
                    block: index,
                    reason: format!("bpm change {:?} dropped", block.bpm_change),
                });
                block.bpm_change = None;
            }
        }
        for repair in &repairs {
            log::warn!("{repair}");
        }
        repairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_is_fully_audible() {
        let b = Block::new(4);
        assert_eq!(b.sound_map, vec![1, 1, 1, 1]);
        assert!(b.sound_map_is_valid());
        assert!(!b.is_auto());
    }

    #[test]
    fn volume_at_reads_flags() {
        let b = Block::with_sound_map(3, vec![1, 0, 1]);
        assert_eq!(b.volume_at(0), 1);
        assert_eq!(b.volume_at(1), 0);
        assert_eq!(b.volume_at(2), 1);
    }

    #[test]
    fn mismatched_sound_map_reads_audible() {
        let b = Block::with_sound_map(3, vec![0]);
        assert!(!b.sound_map_is_valid());
        assert_eq!(b.volume_at(0), 1);
        assert_eq!(b.volume_at(2), 1);
    }

    #[test]
    fn normalise_repairs_value_and_sound_map() {
        let mut chart = Chart::new(vec![
            Block::with_sound_map(9, vec![1, 0]),
            Block::with_sound_map(2, vec![1, 0]),
            Block::new(1).bpm(-5.0),
        ]);
        let repairs = chart.normalise();
        assert_eq!(repairs.len(), 3);
        assert_eq!(chart.blocks[0].value, 6);
        assert_eq!(chart.blocks[0].sound_map, vec![1; 6]);
        assert_eq!(chart.blocks[1].sound_map, vec![1, 0]);
        assert_eq!(chart.blocks[2].bpm_change, None);
        assert!(chart.normalise().is_empty());
    }

    #[test]
    fn out_of_range_json_values_are_clamped_by_normalise() {
        let json = r#"[
            {"value": -1, "soundMap": [1]},
            {"value": 300, "soundMap": [1, 1, 1, 1, 1, 1]},
            {"value": 2, "soundMap": [-3, 7]}
        ]"#;
        let blocks: Vec<Block> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks[0].value, 0);
        assert_eq!(blocks[1].value, 255);
        assert_eq!(blocks[2].sound_map, vec![0, 7]);

        let mut chart = Chart::new(blocks);
        let repairs = chart.normalise();
        assert_eq!(repairs.len(), 2);
        assert_eq!(chart.blocks[0].value, 1);
        assert_eq!(chart.blocks[0].sound_map, vec![1]);
        assert_eq!(chart.blocks[1].value, 6);
        assert_eq!(chart.blocks[1].sound_map, vec![1; 6]);
        assert_eq!(chart.blocks[2].sound_map, vec![0, 1]);
    }

    #[test]
    fn start_block_ignores_out_of_range() {
        let mut chart = Chart::new(vec![Block::new(1), Block::new(2)]);
        assert_eq!(chart.start_block(), None);
        chart.start_pos = Some(1);
        assert_eq!(chart.start_block(), Some(1));
        chart.start_pos = Some(7);
        assert_eq!(chart.start_block(), None);
    }

    #[test]
    fn default_chart_is_well_formed() {
        let mut chart = Chart::default_chart();
        assert_eq!(chart.len(), 16);
        assert!(chart.normalise().is_empty());
    }
}
