//! Audio callback — runs on the cpal audio thread.
//!
//! Drains commands from the ring buffer, mixes every voice whose start frame
//! falls in the current buffer, applies master volume and a hard ceiling, then
//! advances the shared frame counter that serves as the audio clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::bank::CueBank;
use super::command::AudioCommand;

/// Voices beyond this count evict the oldest one.
const MAX_VOICES: usize = 64;

/// Output ceiling applied after mixing.
const CEILING: f32 = 0.95;

/// One cue instance, scheduled or sounding.
struct Voice {
    samples: Arc<[f32]>,
    start_frame: u64,
    /// Read position in source samples (fractional when rate != 1).
    position: f64,
    gain: f32,
    rate: f64,
}

impl Voice {
    fn finished(&self) -> bool {
        self.position >= self.samples.len() as f64
    }

    /// Linear-interpolated sample at the current position, then advance.
    fn next_sample(&mut self) -> f32 {
        let index = self.position as usize;
        let Some(&s0) = self.samples.get(index) else {
            return 0.0;
        };
        let s1 = self.samples.get(index + 1).copied().unwrap_or(0.0);
        let frac = (self.position - index as f64) as f32;
        self.position += self.rate;
        (s0 + (s1 - s0) * frac) * self.gain
    }
}

/// State that lives on the audio thread. Accessed only from the cpal callback.
pub struct AudioCallback {
    consumer: HeapCons<AudioCommand>,
    bank: CueBank,
    voices: Vec<Voice>,
    volume: f32,
    frames: Arc<AtomicU64>,
    channels: u16,
}

impl AudioCallback {
    /// Create a callback that reads commands from `consumer` and advances `frames`.
    pub fn new(
        consumer: HeapCons<AudioCommand>,
        bank: CueBank,
        frames: Arc<AtomicU64>,
        channels: u16,
    ) -> Self {
        Self {
            consumer,
            bank,
            voices: Vec::with_capacity(MAX_VOICES),
            volume: 1.0,
            frames,
            channels: channels.max(1),
        }
    }

    /// Called by cpal for each output buffer.
    pub fn process(&mut self, output: &mut [f32]) {
        while let Some(cmd) = self.consumer.try_pop() {
            match cmd {
                AudioCommand::Play {
                    cue,
                    start_frame,
                    gain,
                    rate,
                } => {
                    if self.voices.len() >= MAX_VOICES {
                        self.voices.remove(0);
                    }
                    self.voices.push(Voice {
                        samples: self.bank.get(cue),
                        start_frame,
                        position: 0.0,
                        gain,
                        rate: rate.max(0.01) as f64,
                    });
                }
                AudioCommand::SetVolume(v) => {
                    self.volume = v.clamp(0.0, 1.0);
                }
                AudioCommand::StopAll => {
                    self.voices.clear();
                }
            }
        }

        output.fill(0.0);

        let channels = self.channels as usize;
        let frame_count = output.len() / channels;
        let block_start = self.frames.load(Ordering::Acquire);

        for voice in self.voices.iter_mut() {
            // Late submissions start at the top of the buffer.
            let first = voice.start_frame.saturating_sub(block_start);
            if first >= frame_count as u64 {
                continue;
            }
            for frame in first as usize..frame_count {
                if voice.finished() {
                    break;
                }
                let value = voice.next_sample() * self.volume;
                for sample in &mut output[frame * channels..(frame + 1) * channels] {
                    *sample += value;
                }
            }
        }
        self.voices.retain(|v| !v.finished());

        for sample in output.iter_mut() {
            *sample = sample.clamp(-CEILING, CEILING);
        }

        self.frames
            .fetch_add(frame_count as u64, Ordering::Release);
    }

    /// Number of voices pending or sounding.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Returns the channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}
