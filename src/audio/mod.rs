//! Audio engine — cpal output stream, lock-free command queue, cue voices.
//!
//! The engine owns the cpal output stream and talks to it through a lock-free
//! ring buffer. Cue submissions are converted to absolute frame positions on
//! the caller's side; the audio callback starts each voice exactly on its
//! frame and advances the shared frame counter that drives [`SampleClock`].

pub mod bank;
pub mod callback;
pub mod clock;
pub mod command;
pub mod cue;

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Producer, Split},
    HeapProd, HeapRb,
};
use thiserror::Error;

pub use bank::CueBank;
pub use clock::{AudioClock, ManualClock, SampleClock};
pub use command::AudioCommand;
pub use cue::{Cue, CueLog, CuePlay, CueSink};

use crate::error::EngineError;
use callback::AudioCallback;

/// Ring buffer capacity (number of commands).
const RING_BUFFER_CAPACITY: usize = 1024;

/// Seed for the hit cue's noise transient.
const CUE_SEED: u64 = 0x6265_6174;

/// Audio engine errors.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("device config error: {0}")]
    DeviceConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream play error: {0}")]
    StreamPlay(String),
    /// The audio thread is not draining commands fast enough.
    #[error("audio command ring buffer is full")]
    BufferFull,
}

impl From<AudioError> for EngineError {
    fn from(err: AudioError) -> Self {
        EngineError::Audio(err.to_string())
    }
}

type SharedProducer = Arc<Mutex<HeapProd<AudioCommand>>>;

/// The audio engine. Owns the cpal stream and the command producer.
///
/// Dropping the engine closes the stream; the clock stops advancing.
pub struct AudioEngine {
    _stream: cpal::Stream,
    producer: SharedProducer,
    clock: SampleClock,
    channels: u16,
}

impl AudioEngine {
    /// Open the default output device at its preferred rate and start the stream.
    pub fn new() -> Result<Self, AudioError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let stream_config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?
            .config();
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels;

        let (producer, consumer) = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY).split();
        let clock = SampleClock::new(sample_rate);
        let mut callback = AudioCallback::new(
            consumer,
            CueBank::synthesize(sample_rate, CUE_SEED),
            clock.counter(),
            channels,
        );

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| callback.process(data),
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        log::info!("audio output: {sample_rate} Hz, {channels} channel(s)");

        Ok(Self {
            _stream: stream,
            producer: Arc::new(Mutex::new(producer)),
            clock,
            channels,
        })
    }

    /// A cue sink that schedules onto this engine. Clones share the queue.
    pub fn sink(&self) -> EngineSink {
        EngineSink {
            producer: Arc::clone(&self.producer),
            clock: self.clock.clone(),
        }
    }

    /// The frame-counting clock advanced by the output stream.
    pub fn clock(&self) -> SampleClock {
        self.clock.clone()
    }

    /// Master volume, clamped to 0.0..=1.0 on the audio thread.
    pub fn set_volume(&self, volume: f32) -> Result<(), AudioError> {
        push(&self.producer, AudioCommand::SetVolume(volume))
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn push(producer: &SharedProducer, cmd: AudioCommand) -> Result<(), AudioError> {
    let mut producer = producer.lock().unwrap_or_else(|e| e.into_inner());
    producer.try_push(cmd).map_err(|_| AudioError::BufferFull)
}

/// [`CueSink`] that converts clock seconds to frames and queues the cue.
#[derive(Clone)]
pub struct EngineSink {
    producer: SharedProducer,
    clock: SampleClock,
}

impl CueSink for EngineSink {
    fn play(&self, play: CuePlay) {
        let cmd = AudioCommand::Play {
            cue: play.cue,
            start_frame: self.clock.seconds_to_frame(play.at),
            gain: play.gain,
            rate: play.rate,
        };
        if let Err(e) = push(&self.producer, cmd) {
            log::warn!("dropped {:?} cue at {:.3}s: {e}", play.cue, play.at);
        }
    }

    fn stop_all(&self) {
        if let Err(e) = push(&self.producer, AudioCommand::StopAll) {
            log::warn!("stop_all not delivered: {e}");
        }
    }
}
