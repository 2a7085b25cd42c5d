//! Judgement — classifying hit timing into tiers, off the frame loop.
//!
//! [`JudgementEngine`] is the pure classifier state machine. [`JudgeWorker`]
//! runs it on a dedicated thread and talks to it only through the messages
//! in [`protocol`], so judgement never stalls the frame loop.

pub mod engine;
pub mod protocol;
pub mod worker;

pub use engine::JudgementEngine;
pub use protocol::{DotRef, JudgeInit, JudgeReply, JudgeRequest, Reply};
pub use worker::JudgeWorker;

use serde::{Deserialize, Serialize};

/// Judgement tier of a timed hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Perfect,
    Good,
    Ok,
    Miss,
}

impl Tier {
    /// Whether the tier counts as a hit and advances the cursor.
    pub fn is_hit(self) -> bool {
        !matches!(self, Tier::Miss)
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Perfect => "Perfect!",
            Tier::Good => "Good!",
            Tier::Ok => "Ok!",
            Tier::Miss => "Miss!",
        }
    }
}

/// Inclusive upper bounds (seconds) of each hit tier, checked in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub perfect: f64,
    pub good: f64,
    pub ok: f64,
}

impl TierThresholds {
    /// Classify a signed deviation (`input - expected`).
    pub fn classify(&self, delta: f64) -> Tier {
        let abs = delta.abs();
        if abs <= self.perfect {
            Tier::Perfect
        } else if abs <= self.good {
            Tier::Good
        } else if abs <= self.ok {
            Tier::Ok
        } else {
            Tier::Miss
        }
    }

    /// Thresholds must be positive and non-decreasing.
    pub fn is_ascending(&self) -> bool {
        self.perfect > 0.0 && self.perfect <= self.good && self.good <= self.ok
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            perfect: 0.05,
            good: 0.08,
            ok: 0.12,
        }
    }
}
