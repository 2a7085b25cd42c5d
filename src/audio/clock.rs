//! Audio clock — a monotonically increasing time reading in seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of "now" for scheduling and judgement.
pub trait AudioClock: Send + Sync {
    /// Seconds since the clock started. Never decreases.
    fn now(&self) -> f64;
}

/// Clock driven by the number of frames the output stream has rendered.
///
/// The audio callback advances the shared counter after each buffer, so the
/// reading is exactly the position of the next frame to be played.
#[derive(Debug, Clone)]
pub struct SampleClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl SampleClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Shared counter for the audio callback to advance.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.frames)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Convert clock seconds to an absolute frame index.
    pub fn seconds_to_frame(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }
}

impl AudioClock for SampleClock {
    fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Hand-driven clock for tests and offline runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    /// Move the clock to `seconds`. Earlier values are ignored.
    pub fn set(&self, seconds: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (seconds > f64::from_bits(bits)).then(|| seconds.to_bits())
            });
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
