//! Conductor — the single source of truth for tempo and beat duration.

use crate::error::{validate_bpm, EngineError};

/// Current tempo and the derived duration of one beat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conductor {
    bpm: f64,
    beat_duration: f64,
}

impl Conductor {
    /// Create a conductor. Fails with `InvalidTempo` for `bpm <= 0` or non-finite.
    pub fn new(bpm: f64) -> Result<Self, EngineError> {
        let bpm = validate_bpm(bpm)?;
        Ok(Self {
            bpm,
            beat_duration: 60.0 / bpm,
        })
    }

    /// Replace the tempo. On error the previous tempo is kept.
    ///
    /// Returns the beat duration in effect before the change, so callers
    /// holding a cached "next beat" time can shift it by `new - old` and keep
    /// their phase.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<f64, EngineError> {
        let bpm = validate_bpm(bpm)?;
        let old = self.beat_duration;
        self.bpm = bpm;
        self.beat_duration = 60.0 / bpm;
        log::info!("tempo set to {bpm} bpm, beat = {:.3}s", self.beat_duration);
        Ok(old)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Seconds per beat (`60 / bpm`).
    pub fn beat_duration(&self) -> f64 {
        self.beat_duration
    }
}
