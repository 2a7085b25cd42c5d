//! Error taxonomy for the timing engine.
//!
//! Only [`EngineError::InvalidTempo`] is fatal to a session. The remaining
//! anomalies are recovered where they occur (skip or default) and exist as
//! variants so the recovery can be logged with a consistent message.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Tempo is zero, negative, or not finite.
    #[error("invalid tempo: {0} bpm")]
    InvalidTempo(f64),

    /// A chart block was repaired in place.
    #[error("malformed block {block}: {reason}")]
    MalformedChart { block: usize, reason: String },

    /// A judgement reply referenced an index outside the current schedule.
    #[error("stale judgement reply for index {index} (schedule has {len} entries)")]
    StaleWorkerReply { index: usize, len: usize },

    /// The render target has no element for a schedule entry's block.
    #[error("no render target for block {block}")]
    MissingRenderTarget { block: usize },

    #[error("chart i/o error: {0}")]
    ChartIo(#[from] std::io::Error),

    #[error("chart parse error: {0}")]
    ChartParse(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("audio error: {0}")]
    Audio(String),

    /// A background thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    /// The judgement worker thread has gone away.
    #[error("judgement worker disconnected")]
    WorkerDisconnected,
}

/// Reject tempos that would put Infinity or NaN into a schedule.
pub fn validate_bpm(bpm: f64) -> Result<f64, EngineError> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(EngineError::InvalidTempo(bpm))
    }
}
