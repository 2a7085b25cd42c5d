//! Commands sent from the scheduling threads to the audio thread via ring buffer.

use super::cue::Cue;

/// Commands sent to the audio thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCommand {
    /// Start a cue at an absolute frame position.
    Play {
        cue: Cue,
        start_frame: u64,
        gain: f32,
        rate: f32,
    },

    /// Set master volume (0.0 to 1.0).
    SetVolume(f32),

    /// Drop every pending and sounding voice.
    StopAll,
}
