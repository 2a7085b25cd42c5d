//! Offset calibration — measures the player's input latency.
//!
//! Four sequences of four beats at 120 BPM. The player taps on the third
//! beat of each sequence; the first tap close enough to that beat (shifted by
//! the current offset) is recorded. The average deviation is added to the
//! current offset.

use crate::audio::{Cue, CuePlay};

pub const CALIBRATION_BPM: f64 = 120.0;
pub const SEQUENCES: usize = 4;
pub const BEATS_PER_SEQUENCE: usize = 4;
/// Zero-based index of the beat the player taps on.
pub const TARGET_BEAT: usize = 2;
/// Accept window as a fraction of the beat duration.
const WINDOW_FRACTION: f64 = 0.6;

/// Seconds per calibration beat.
pub fn beat_duration() -> f64 {
    60.0 / CALIBRATION_BPM
}

/// Beat times of one sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sequence {
    pub number: usize,
    pub beats: [f64; BEATS_PER_SEQUENCE],
}

impl Sequence {
    pub fn target(&self) -> f64 {
        self.beats[TARGET_BEAT]
    }

    /// When the next sequence may begin (one beat after the last).
    pub fn end(&self) -> f64 {
        self.beats[BEATS_PER_SEQUENCE - 1] + beat_duration()
    }

    /// The sounds of this sequence: two lead-in beats, then the target.
    /// The fourth beat is silent.
    pub fn cues(&self) -> Vec<CuePlay> {
        self.beats[..=TARGET_BEAT]
            .iter()
            .enumerate()
            .map(|(i, &at)| {
                let cue = if i == TARGET_BEAT { Cue::Metronome } else { Cue::Hit };
                CuePlay::new(cue, at, 2.0)
            })
            .collect()
    }
}

/// Final result of a calibration run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    /// Mean deviation, rounded to whole milliseconds.
    pub average_ms: i64,
    /// Offset to store in the settings.
    pub new_offset_ms: f64,
}

#[derive(Debug, Clone)]
pub struct Calibration {
    current_offset_ms: f64,
    completed: usize,
    current: Option<Sequence>,
    tapped: bool,
    deviations: Vec<f64>,
}

impl Calibration {
    pub fn new(current_offset_ms: f64) -> Self {
        Self {
            current_offset_ms,
            completed: 0,
            current: None,
            tapped: false,
            deviations: Vec::new(),
        }
    }

    /// Start the next sequence at audio-clock `now`. `None` once all are done.
    pub fn begin_sequence(&mut self, now: f64) -> Option<Sequence> {
        if self.current.take().is_some() {
            self.completed += 1;
        }
        if self.completed >= SEQUENCES {
            return None;
        }
        let step = beat_duration();
        let mut beats = [0.0; BEATS_PER_SEQUENCE];
        for (i, beat) in beats.iter_mut().enumerate() {
            *beat = now + i as f64 * step;
        }
        let sequence = Sequence {
            number: self.completed + 1,
            beats,
        };
        self.current = Some(sequence);
        self.tapped = false;
        Some(sequence)
    }

    /// Record a tap at `t`. Returns the deviation in seconds when accepted.
    ///
    /// Only the first tap inside the window counts for each sequence.
    pub fn tap(&mut self, t: f64) -> Option<f64> {
        let sequence = self.current?;
        if self.tapped {
            return None;
        }
        let target = sequence.target() + self.current_offset_ms / 1000.0;
        let deviation = t - target;
        if deviation.abs() >= beat_duration() * WINDOW_FRACTION {
            return None;
        }
        self.tapped = true;
        self.deviations.push(deviation);
        log::debug!("calibration tap {:+.0} ms", deviation * 1000.0);
        Some(deviation)
    }

    pub fn taps(&self) -> &[f64] {
        &self.deviations
    }

    pub fn is_done(&self) -> bool {
        self.completed >= SEQUENCES
    }

    /// Average the recorded taps. `None` when nothing was recorded.
    pub fn finish(&self) -> Option<CalibrationResult> {
        if self.deviations.is_empty() {
            return None;
        }
        let average = self.deviations.iter().sum::<f64>() / self.deviations.len() as f64;
        let average_ms = (average * 1000.0).round() as i64;
        Some(CalibrationResult {
            average_ms,
            new_offset_ms: self.current_offset_ms + average_ms as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn four_sequences_then_done() {
        let mut cal = Calibration::new(0.0);
        let mut now = 1.0;
        for n in 1..=SEQUENCES {
            let seq = cal.begin_sequence(now).unwrap();
            assert_eq!(seq.number, n);
            assert_eq!(seq.beats[0], now);
            assert_approx_eq!(seq.target(), now + 1.0);
            now = seq.end();
        }
        assert!(cal.begin_sequence(now).is_none());
        assert!(cal.is_done());
    }

    #[test]
    fn sequence_cues_skip_last_beat() {
        let mut cal = Calibration::new(0.0);
        let seq = cal.begin_sequence(0.0).unwrap();
        let cues = seq.cues();
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[2].cue, Cue::Metronome);
        assert_eq!(cues[2].at, 1.0);
    }

    #[test]
    fn one_tap_per_sequence_inside_window() {
        let mut cal = Calibration::new(0.0);
        assert!(cal.tap(1.0).is_none());
        cal.begin_sequence(0.0).unwrap();
        // window is 0.3 s around the target at 1.0
        assert!(cal.tap(0.6).is_none());
        assert_approx_eq!(cal.tap(1.04).unwrap(), 0.04);
        assert!(cal.tap(1.0).is_none());
        assert_eq!(cal.taps().len(), 1);
    }

    #[test]
    fn window_is_relative_to_current_offset() {
        let mut cal = Calibration::new(100.0);
        cal.begin_sequence(0.0).unwrap();
        assert_approx_eq!(cal.tap(1.08).unwrap(), -0.02);
    }

    #[test]
    fn finish_averages_and_rounds() {
        let mut cal = Calibration::new(20.0);
        for (i, tap) in [0.03, 0.05, 0.0401].into_iter().enumerate() {
            let start = i as f64 * 10.0;
            cal.begin_sequence(start).unwrap();
            cal.tap(start + 1.02 + tap).unwrap();
        }
        let result = cal.finish().unwrap();
        assert_eq!(result.average_ms, 40);
        assert_eq!(result.new_offset_ms, 60.0);
    }

    #[test]
    fn finish_without_taps_is_none() {
        let mut cal = Calibration::new(0.0);
        cal.begin_sequence(0.0);
        assert!(cal.finish().is_none());
    }
}
