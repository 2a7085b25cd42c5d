//! Timing table — a chart flattened into a time-stamped pip schedule.
//!
//! Each block spans exactly one beat; its pips divide that beat evenly in the
//! block's fixed traversal order. A block's tempo change applies to its own
//! pips and everything after it. The table is built once per session and is
//! read-only afterwards.

use crate::chart::{pip_order, Chart};

/// One scheduled pip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEntry {
    /// Absolute audio-clock time in seconds.
    pub timestamp: f64,
    /// Index of the owning block in the chart.
    pub block: usize,
    /// Pip position on the die face.
    pub pip: u8,
    /// Sound flag: 0 = silent subdivision.
    pub volume: u8,
    /// Whether the owning block judges itself.
    pub is_auto: bool,
}

impl ScheduleEntry {
    pub fn is_silent(&self) -> bool {
        self.volume == 0
    }
}

/// The flattened schedule plus derived bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingTable {
    entries: Vec<ScheduleEntry>,
    /// Timestamps of pips that need player input (audible, not auto).
    actual_beats: Vec<f64>,
    /// Elapsed schedule time at the chart's start block.
    start_pos_offset: f64,
    /// Timestamp of subdivision 0.
    start: f64,
    /// First schedule index of each block.
    block_starts: Vec<usize>,
}

impl TimingTable {
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn actual_beats(&self) -> &[f64] {
        &self.actual_beats
    }

    pub fn start_pos_offset(&self) -> f64 {
        self.start_pos_offset
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    /// Schedule index of the first pip of `block`.
    pub fn first_index_of_block(&self, block: usize) -> Option<usize> {
        self.block_starts.get(block).copied()
    }

    /// First index in `lo..` whose timestamp is `>= target`.
    ///
    /// Returns `len()` when every remaining entry is earlier than `target`.
    pub fn lower_bound(&self, target: f64, lo: usize) -> usize {
        let lo = lo.min(self.entries.len());
        lo + self.entries[lo..].partition_point(|e| e.timestamp < target)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|e| e.timestamp)
    }
}

/// Expands charts into timing tables.
#[derive(Debug, Clone, Copy)]
pub struct TimingTableBuilder {
    beat_duration: f64,
}

impl TimingTableBuilder {
    /// `beat_duration` is the conductor's tempo at the start of the chart.
    pub fn new(beat_duration: f64) -> Self {
        Self { beat_duration }
    }

    /// Build the schedule with subdivision 0 sounding at `start`.
    ///
    /// Pure and deterministic: identical inputs give bit-identical output.
    pub fn build(&self, chart: &Chart, start: f64) -> TimingTable {
        let pip_total: usize = chart
            .blocks
            .iter()
            .map(|b| pip_order(b.value).len())
            .sum();
        let mut entries = Vec::with_capacity(pip_total);
        let mut actual_beats = Vec::new();
        let mut block_starts = Vec::with_capacity(chart.len());

        let start_block = chart.start_block().filter(|&b| b != 0);
        let mut start_pos_offset = None;

        let mut time = start;
        let mut beat_duration = self.beat_duration;

        for (index, block) in chart.blocks.iter().enumerate() {
            if let Some(bpm) = block.valid_bpm_change() {
                beat_duration = 60.0 / bpm;
            }
            block_starts.push(entries.len());

            let steps = pip_order(block.value);
            let step_duration = beat_duration / steps.len() as f64;
            let is_auto = block.is_auto();

            for (step, &pip) in steps.iter().enumerate() {
                let volume = block.volume_at(step);
                entries.push(ScheduleEntry {
                    timestamp: time,
                    block: index,
                    pip,
                    volume,
                    is_auto,
                });
                if volume == 1 && !is_auto {
                    actual_beats.push(time);
                }
                if start_block == Some(index) && start_pos_offset.is_none() {
                    start_pos_offset = Some(time - start);
                }
                time += step_duration;
            }
        }

        TimingTable {
            entries,
            actual_beats,
            start_pos_offset: start_pos_offset.unwrap_or(0.0),
            start,
            block_starts,
        }
    }
}
