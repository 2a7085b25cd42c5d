//! Metronome — lookahead cue scheduling and its timer thread.

pub mod scheduler;
pub mod timer;

pub use scheduler::{accent, AudioScheduler};
pub use timer::LookaheadTimer;
