//! Lookahead scheduler — submits cues slightly ahead of the audio clock.
//!
//! Each pass submits every metronome tick and hit cue that falls before
//! `now + schedule_ahead` and nothing later, so tempo and volume changes can
//! still take effect on cues that have not been submitted yet.

use std::sync::Arc;

use crate::audio::{Cue, CuePlay, CueSink};
use crate::config::Settings;
use crate::error::EngineError;
use crate::timing::{Conductor, Cursor, TimingTable};

/// Accent applied to metronome tick `count` as `(gain multiplier, rate)`.
///
/// Every 4th tick past the first four is played twice as loud and 1.2x fast.
/// The count carries across tempo changes.
pub fn accent(count: i64) -> (f32, f32) {
    if count > 4 && (count - 4) % 4 == 0 {
        (2.0, 1.2)
    } else {
        (1.0, 1.0)
    }
}

/// Hit cues of one session, consumed in schedule order.
#[derive(Debug, Clone)]
struct HitCueTrack {
    table: Arc<TimingTable>,
    cursor: Cursor,
    /// Subtracted from each timestamp to get the audio-clock start time.
    shift: f64,
}

/// Metronome and hit cue scheduler. Owns the session's [`Conductor`].
#[derive(Debug, Clone)]
pub struct AudioScheduler {
    conductor: Conductor,
    schedule_ahead: f64,
    next_note_time: f64,
    metro_count: i64,
    metronome_enabled: bool,
    metronome_gain: f32,
    hit_gain: f32,
    hits: Option<HitCueTrack>,
}

impl AudioScheduler {
    pub fn new(conductor: Conductor, schedule_ahead: f64) -> Self {
        Self {
            conductor,
            schedule_ahead,
            next_note_time: 0.0,
            metro_count: -1,
            metronome_enabled: true,
            metronome_gain: 1.0,
            hit_gain: 1.0,
            hits: None,
        }
    }

    /// Take volumes and the metronome switch from the player settings.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.metronome_enabled = settings.metronome_enabled;
        self.metronome_gain = settings.metronome_gain();
        self.hit_gain = settings.hitsound_gain();
    }

    /// Restart the metronome at `now`. The first tick counts as `start_block`.
    pub fn reset(&mut self, now: f64, start_block: usize) {
        self.next_note_time = now;
        self.metro_count = start_block as i64 - 1;
        self.hits = None;
    }

    /// Schedule the audible entries of `table` from index `from` onward.
    pub fn attach_hit_cues(&mut self, table: Arc<TimingTable>, from: usize, shift: f64) {
        self.hits = Some(HitCueTrack {
            table,
            cursor: Cursor::new(from),
            shift,
        });
    }

    pub fn detach_hit_cues(&mut self) {
        self.hits = None;
    }

    /// One lookahead pass. Returns the number of cues submitted.
    pub fn pass(&mut self, now: f64, sink: &dyn CueSink) -> usize {
        let horizon = now + self.schedule_ahead;
        let mut submitted = 0;

        while self.next_note_time < horizon {
            self.metro_count += 1;
            if self.metronome_enabled {
                let (boost, rate) = accent(self.metro_count);
                sink.play(CuePlay {
                    cue: Cue::Metronome,
                    at: self.next_note_time,
                    gain: self.metronome_gain * boost,
                    rate,
                });
                submitted += 1;
            }
            self.next_note_time += self.conductor.beat_duration();
        }

        if let Some(track) = self.hits.as_mut() {
            while let Some(entry) = track.table.get(track.cursor.get()) {
                let at = entry.timestamp - track.shift;
                if at >= horizon {
                    break;
                }
                if !entry.is_silent() {
                    sink.play(CuePlay::new(
                        Cue::Hit,
                        at,
                        self.hit_gain * entry.volume as f32,
                    ));
                    submitted += 1;
                }
                track.cursor.step();
            }
        }

        submitted
    }

    /// Change tempo, keeping the phase of the next tick.
    ///
    /// The next tick moves by the difference between the new and old beat
    /// durations. Returns the old beat duration.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<f64, EngineError> {
        let old = self.conductor.set_bpm(bpm)?;
        self.next_note_time = self.next_note_time - old + self.conductor.beat_duration();
        Ok(old)
    }

    pub fn conductor(&self) -> &Conductor {
        &self.conductor
    }

    pub fn next_note_time(&self) -> f64 {
        self.next_note_time
    }

    /// Count of the most recently scheduled tick.
    pub fn metro_count(&self) -> i64 {
        self.metro_count
    }

    /// Index of the next hit cue to submit, if hit cues are attached.
    pub fn hit_cursor(&self) -> Option<usize> {
        self.hits.as_ref().map(|h| h.cursor.get())
    }
}
