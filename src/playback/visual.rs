//! Visual sync — the frame-driven cursor that lights pips as time passes.
//!
//! Each frame walks the schedule from the visual cursor while "now" has
//! reached the next entry, capped at a fixed batch so a long stall cannot
//! turn into one long frame. Leftover work is picked up on the next frame.

use crate::chart::Chart;
use crate::error::EngineError;
use crate::judge::DotRef;
use crate::timing::{Cursor, TimingTable};

use super::render::RenderTarget;

/// Outcome of one frame's walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualStep {
    /// Entries the cursor moved past.
    pub processed: usize,
    /// Tempo changes reached this frame, in schedule order.
    pub tempo_changes: Vec<f64>,
    /// `(index, scheduled time)` of entries that judge themselves.
    pub auto_hits: Vec<(usize, f64)>,
    /// The batch cap was hit with eligible entries left over.
    pub behind: bool,
    /// The cursor is past the last entry.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct VisualSync {
    cursor: Cursor,
    max_batch: usize,
}

impl VisualSync {
    pub fn new(start: usize, max_batch: usize) -> Self {
        Self {
            cursor: Cursor::new(start),
            max_batch: max_batch.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.cursor.get()
    }

    /// Advance through every entry due at `now`, up to the batch cap.
    ///
    /// `listening` makes every entry judge itself. Entries whose block has no
    /// render element are passed over without drawing; their tempo changes
    /// and auto hits still apply.
    pub fn step(
        &mut self,
        table: &TimingTable,
        chart: &Chart,
        now: f64,
        listening: bool,
        target: &mut dyn RenderTarget,
    ) -> VisualStep {
        let mut step = VisualStep::default();
        let mut faces: Vec<usize> = Vec::new();

        while step.processed < self.max_batch {
            let index = self.cursor.get();
            let Some(entry) = table.get(index) else {
                break;
            };
            if entry.timestamp > now {
                break;
            }
            self.cursor.step();
            step.processed += 1;

            let block = chart.get(entry.block);
            if table.first_index_of_block(entry.block) == Some(index) {
                if let Some(bpm) = block.and_then(|b| b.valid_bpm_change()) {
                    step.tempo_changes.push(bpm);
                }
            }
            if entry.is_auto || listening {
                step.auto_hits.push((index, entry.timestamp));
            }

            if !target.has_block(entry.block) {
                log::debug!(
                    "{}",
                    EngineError::MissingRenderTarget { block: entry.block }
                );
                continue;
            }
            target.activate_pip(DotRef {
                block: entry.block,
                pip: entry.pip,
            });
            if !faces.contains(&entry.block) {
                faces.push(entry.block);
            }
        }

        for block in faces {
            let value = chart.get(block).map_or(1, |b| b.effective_value());
            target.apply_face(block, value);
        }

        step.behind = table
            .get(self.cursor.get())
            .is_some_and(|e| e.timestamp <= now);
        step.finished = self.cursor.get() >= table.len();
        step
    }
}
