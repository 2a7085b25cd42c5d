//! Cue playback primitive — "play this sound at audio-clock time T".

use std::sync::{Arc, Mutex};

/// The sounds the engine can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Metronome,
    Hit,
}

/// A single scheduled playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuePlay {
    pub cue: Cue,
    /// Audio-clock start time in seconds.
    pub at: f64,
    pub gain: f32,
    /// Playback rate (1.0 = original pitch).
    pub rate: f32,
}

impl CuePlay {
    pub fn new(cue: Cue, at: f64, gain: f32) -> Self {
        Self {
            cue,
            at,
            gain,
            rate: 1.0,
        }
    }
}

/// Destination for scheduled cues.
///
/// Implementations honour `at` precisely even when the call itself arrives a
/// few milliseconds early.
pub trait CueSink: Send + Sync {
    fn play(&self, play: CuePlay);

    /// Silence every scheduled and sounding cue.
    fn stop_all(&self);
}

/// Sink that records submissions instead of playing them.
#[derive(Debug, Clone, Default)]
pub struct CueLog {
    plays: Arc<Mutex<Vec<CuePlay>>>,
    stops: Arc<Mutex<usize>>,
}

impl CueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted so far, in submission order.
    pub fn plays(&self) -> Vec<CuePlay> {
        self.plays.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn plays_of(&self, cue: Cue) -> Vec<CuePlay> {
        self.plays().into_iter().filter(|p| p.cue == cue).collect()
    }

    /// Number of `stop_all` calls.
    pub fn stops(&self) -> usize {
        self.stops.lock().map(|s| *s).unwrap_or(0)
    }
}

impl CueSink for CueLog {
    fn play(&self, play: CuePlay) {
        if let Ok(mut plays) = self.plays.lock() {
            plays.push(play);
        }
    }

    fn stop_all(&self) {
        if let Ok(mut stops) = self.stops.lock() {
            *stops += 1;
        }
    }
}
