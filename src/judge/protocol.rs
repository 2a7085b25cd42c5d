//! Messages exchanged with the judgement worker.
//!
//! Every message carries the session generation it belongs to. The worker
//! echoes it back so the session can drop replies from a previous run.

use super::{Tier, TierThresholds};
use crate::timing::TimingTable;

/// Identifies a pip on a die: the owning block and pip position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DotRef {
    pub block: usize,
    pub pip: u8,
}

/// Per-session schedule data handed to the worker once, before any hit.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeInit {
    pub subdivision_times: Vec<f64>,
    pub dot_map: Vec<DotRef>,
    pub volume_map: Vec<u8>,
    pub hit_window: f64,
    pub thresholds: TierThresholds,
}

impl JudgeInit {
    pub fn from_table(table: &TimingTable, hit_window: f64, thresholds: TierThresholds) -> Self {
        let entries = table.entries();
        Self {
            subdivision_times: entries.iter().map(|e| e.timestamp).collect(),
            dot_map: entries
                .iter()
                .map(|e| DotRef {
                    block: e.block,
                    pip: e.pip,
                })
                .collect(),
            volume_map: entries.iter().map(|e| e.volume).collect(),
            hit_window,
            thresholds,
        }
    }
}

/// Requests sent to the worker. Processed strictly in order.
#[derive(Debug, Clone, PartialEq)]
pub enum JudgeRequest {
    Init {
        generation: u64,
        data: JudgeInit,
    },
    Hit {
        generation: u64,
        /// Input time in schedule seconds.
        input: f64,
        /// Index of the beat being judged.
        index: usize,
        /// Scheduled time of that beat (NaN when past the end).
        expected: f64,
    },
    Shutdown,
}

/// Outcome of one hit request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    /// The index is past the end of the schedule.
    Finished,
    /// A silent subdivision: flash only, no timing judgement.
    SilentHit {
        index: usize,
        target: DotRef,
        input: f64,
    },
    /// A timed judgement with its signed deviation in seconds.
    Judged {
        index: usize,
        tier: Tier,
        target: DotRef,
        delta: f64,
    },
}

/// A reply tagged with the generation of the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeReply {
    pub generation: u64,
    pub reply: Reply,
}
