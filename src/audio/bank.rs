//! Synthesized cue sounds.
//!
//! Each generator produces a mono f32 buffer at the given sample rate. The hit
//! cue's noise transient uses a seeded `ChaCha8Rng` so it renders identically
//! every run.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::cue::Cue;

/// Metronome click (~60ms): 1.5 kHz sine with a fast exponential decay.
pub fn generate_click(sample_rate: u32) -> Vec<f32> {
    let duration_secs = 0.06;
    let num_samples = (sample_rate as f64 * duration_secs) as usize;
    let mut output = Vec::with_capacity(num_samples);
    let mut phase = 0.0_f64;

    for i in 0..num_samples {
        let norm = i as f64 / num_samples as f64;
        let amp = (-norm * 9.0).exp();
        phase += 1500.0 / sample_rate as f64;
        output.push(((phase * 2.0 * std::f64::consts::PI).sin() * amp * 0.6) as f32);
    }

    output
}

/// Bongo-like hit (~150ms): a falling 320→220 Hz body plus a short noise slap.
pub fn generate_hit(sample_rate: u32, seed: u64) -> Vec<f32> {
    let duration_secs = 0.15;
    let num_samples = (sample_rate as f64 * duration_secs) as usize;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut output = Vec::with_capacity(num_samples);
    let mut phase = 0.0_f64;

    for i in 0..num_samples {
        let norm = i as f64 / num_samples as f64;

        let freq = 220.0 + 100.0 * (-norm * 12.0).exp();
        phase += freq / sample_rate as f64;
        let body = (phase * 2.0 * std::f64::consts::PI).sin() * (-norm * 7.0).exp();

        let slap: f64 = rng.gen_range(-1.0..1.0) * (-norm * 60.0).exp();

        output.push((body * 0.6 + slap * 0.3) as f32);
    }

    output
}

/// Rendered buffers for every [`Cue`], shared with the audio thread.
#[derive(Debug, Clone)]
pub struct CueBank {
    metronome: Arc<[f32]>,
    hit: Arc<[f32]>,
}

impl CueBank {
    pub fn synthesize(sample_rate: u32, seed: u64) -> Self {
        Self {
            metronome: generate_click(sample_rate).into(),
            hit: generate_hit(sample_rate, seed).into(),
        }
    }

    pub fn get(&self, cue: Cue) -> Arc<[f32]> {
        match cue {
            Cue::Metronome => Arc::clone(&self.metronome),
            Cue::Hit => Arc::clone(&self.hit),
        }
    }
}
