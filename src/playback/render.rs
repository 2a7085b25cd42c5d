//! Render target — the callbacks through which playback reaches the UI.

use crate::judge::{DotRef, Tier};

/// A judged hit as shown to the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Judgement {
    pub index: usize,
    pub tier: Tier,
    pub target: DotRef,
    /// Signed deviation in seconds (positive = late).
    pub delta: f64,
}

impl Judgement {
    /// Deviation in whole milliseconds.
    pub fn delta_ms(&self) -> i64 {
        (self.delta * 1000.0).round() as i64
    }
}

/// Receives visual updates from a running session.
///
/// Every method is called on the frame thread, from `Session::frame`.
pub trait RenderTarget {
    /// Whether an element exists for `block`. Entries without one are skipped.
    fn has_block(&self, _block: usize) -> bool {
        true
    }

    /// The visual cursor reached this pip.
    fn activate_pip(&mut self, dot: DotRef);

    /// Show `value` on the face of `block`. Called at most once per block per frame.
    fn apply_face(&mut self, block: usize, value: u8);

    /// A silent subdivision was hit.
    fn flash_pip(&mut self, dot: DotRef);

    fn show_judgement(&mut self, judgement: Judgement);

    /// An input beat passed its window without a hit.
    fn beat_missed(&mut self, _dot: DotRef) {}

    fn tempo_changed(&mut self, _bpm: f64) {}
}

/// Something a [`RenderLog`] received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderEvent {
    Pip(DotRef),
    Face { block: usize, value: u8 },
    Flash(DotRef),
    Judged(Judgement),
    Missed(DotRef),
    Tempo(f64),
}

/// Target that records every call, for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct RenderLog {
    pub events: Vec<RenderEvent>,
    /// Number of blocks that exist; `None` means every block exists.
    pub blocks: Option<usize>,
}

impl RenderLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose UI only has elements for the first `blocks` blocks.
    pub fn with_blocks(blocks: usize) -> Self {
        Self {
            events: Vec::new(),
            blocks: Some(blocks),
        }
    }

    pub fn judgements(&self) -> Vec<Judgement> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Judged(j) => Some(*j),
                _ => None,
            })
            .collect()
    }

    pub fn pips(&self) -> Vec<DotRef> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Pip(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    pub fn misses(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RenderEvent::Missed(_)))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl RenderTarget for RenderLog {
    fn has_block(&self, block: usize) -> bool {
        self.blocks.map_or(true, |n| block < n)
    }

    fn activate_pip(&mut self, dot: DotRef) {
        self.events.push(RenderEvent::Pip(dot));
    }

    fn apply_face(&mut self, block: usize, value: u8) {
        self.events.push(RenderEvent::Face { block, value });
    }

    fn flash_pip(&mut self, dot: DotRef) {
        self.events.push(RenderEvent::Flash(dot));
    }

    fn show_judgement(&mut self, judgement: Judgement) {
        self.events.push(RenderEvent::Judged(judgement));
    }

    fn beat_missed(&mut self, dot: DotRef) {
        self.events.push(RenderEvent::Missed(dot));
    }

    fn tempo_changed(&mut self, bpm: f64) {
        self.events.push(RenderEvent::Tempo(bpm));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_ms_rounds() {
        let j = Judgement {
            index: 0,
            tier: Tier::Good,
            target: DotRef { block: 0, pip: 0 },
            delta: -0.0616,
        };
        assert_eq!(j.delta_ms(), -62);
    }

    #[test]
    fn log_respects_block_limit() {
        let log = RenderLog::with_blocks(2);
        assert!(log.has_block(1));
        assert!(!log.has_block(2));
        assert!(RenderLog::new().has_block(usize::MAX));
    }
}
