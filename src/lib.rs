//! Beat Blocks — a rhythm-game timing engine.
//!
//! Charts of dice-shaped beat blocks are flattened into a time-stamped pip
//! schedule, played back against the audio clock with a lookahead metronome,
//! and player input is judged on a separate worker thread.

pub mod audio;
pub mod calibration;
pub mod chart;
pub mod config;
pub mod error;
pub mod input;
pub mod judge;
pub mod metronome;
pub mod playback;
pub mod timing;

pub use error::EngineError;
