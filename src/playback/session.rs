//! Playback session — the control surface over one chart.
//!
//! A session owns the chart, the scheduler (and through it the conductor),
//! the judgement worker and the cursors of the current run. `start` builds a
//! fresh timing table and bumps the generation; replies tagged with an older
//! generation are dropped when they arrive.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::audio::{AudioClock, Cue, CuePlay, CueSink};
use crate::chart::{Chart, SongFile};
use crate::config::{EngineConfig, Settings};
use crate::error::{validate_bpm, EngineError};
use crate::judge::{DotRef, JudgeInit, JudgeReply, JudgeRequest, JudgeWorker, Reply};
use crate::metronome::{AudioScheduler, LookaheadTimer};
use crate::timing::{Conductor, Cursor, MissSweeper, TimingTable, TimingTableBuilder};

use super::render::{Judgement, RenderTarget};
use super::visual::VisualSync;

/// What a call to [`Session::frame`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// No run in progress.
    Idle,
    Running,
    /// The visual batch cap was hit; call again next frame.
    Behind,
    /// The visual cursor passed the last entry. The metronome is stopped.
    Finished,
}

/// When and where an external backing track should start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackingTrack {
    /// Audio-clock time at which the track starts.
    pub start_at: f64,
    /// Position within the track to start from, in seconds.
    pub seek: f64,
}

/// State of one run, discarded on reset.
struct Run {
    table: Arc<TimingTable>,
    next_expected: Cursor,
    visual: VisualSync,
    /// Entries that already produced a judgement or miss.
    judged: Vec<bool>,
    /// Indices swept during `judge_hit`, reported on the next frame.
    pending_misses: Vec<usize>,
    track_start: f64,
    start_block: usize,
    finished: bool,
}

impl Run {
    fn mark(&mut self, index: usize) -> bool {
        match self.judged.get_mut(index) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            }
            _ => false,
        }
    }
}

pub struct Session {
    chart: Chart,
    bpm: f64,
    config: EngineConfig,
    settings: Settings,
    clock: Arc<dyn AudioClock>,
    sink: Arc<dyn CueSink>,
    scheduler: Arc<Mutex<AudioScheduler>>,
    timer: Option<LookaheadTimer>,
    worker: JudgeWorker,
    sweeper: MissSweeper,
    generation: u64,
    listening: bool,
    run: Option<Run>,
}

impl Session {
    /// Create an idle session. Malformed blocks are repaired in place.
    pub fn new(
        mut chart: Chart,
        bpm: f64,
        config: EngineConfig,
        settings: Settings,
        clock: Arc<dyn AudioClock>,
        sink: Arc<dyn CueSink>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let conductor = Conductor::new(bpm)?;
        let repaired = chart.normalise();
        if !repaired.is_empty() {
            log::info!("chart loaded with {} repaired block(s)", repaired.len());
        }

        let mut scheduler = AudioScheduler::new(conductor, config.schedule_ahead_window);
        scheduler.apply_settings(&settings);

        Ok(Self {
            chart,
            bpm,
            sweeper: MissSweeper::new(config.hit_window),
            listening: config.auto_listen,
            config,
            settings,
            clock,
            sink,
            scheduler: Arc::new(Mutex::new(scheduler)),
            timer: None,
            worker: JudgeWorker::spawn()?,
            generation: 0,
            run: None,
        })
    }

    /// Create a session for a loaded song file.
    pub fn from_song(
        song: SongFile,
        config: EngineConfig,
        settings: Settings,
        clock: Arc<dyn AudioClock>,
        sink: Arc<dyn CueSink>,
    ) -> Result<Self, EngineError> {
        Self::new(song.chart, song.bpm, config, settings, clock, sink)
    }

    fn scheduler(&self) -> MutexGuard<'_, AudioScheduler> {
        self.scheduler.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Begin playback with `start_index` as the first audible block.
    ///
    /// A running session is reset first. The metronome counts in for
    /// `countdown_beats` beats before the first pip.
    pub fn start(&mut self, start_index: usize) -> Result<(), EngineError> {
        self.reset();
        let table_beat = Conductor::new(self.bpm)?.beat_duration();

        let start_block = if start_index < self.chart.len() {
            start_index
        } else {
            if start_index > 0 {
                log::warn!(
                    "start block {start_index} is past the end of a {}-block chart, starting from 0",
                    self.chart.len()
                );
            }
            0
        };
        self.chart.start_pos = Some(start_block);
        self.generation += 1;

        // Tempo changes up to and including the start block are already in
        // effect when its first pip sounds.
        let start_bpm = self
            .chart
            .blocks
            .iter()
            .take(start_block + 1)
            .filter_map(|b| b.valid_bpm_change())
            .last()
            .unwrap_or(self.bpm);

        let now = self.clock.now();
        let beat = {
            let mut scheduler = self.scheduler();
            if scheduler.conductor().bpm() != start_bpm {
                scheduler.set_bpm(start_bpm)?;
            }
            scheduler.apply_settings(&self.settings);
            scheduler.reset(now, start_block);
            scheduler.conductor().beat_duration()
        };

        let track_start = now + self.config.countdown_beats as f64 * beat;
        let table = Arc::new(
            TimingTableBuilder::new(table_beat)
                .build(&self.chart, track_start + self.settings.offset_secs()),
        );
        let first = table.first_index_of_block(start_block).unwrap_or(0);

        self.worker.send(JudgeRequest::Init {
            generation: self.generation,
            data: JudgeInit::from_table(
                &table,
                self.config.hit_window,
                self.config.tier_thresholds,
            ),
        })?;

        {
            let mut scheduler = self.scheduler();
            if !self.settings.play_hitsounds_on_hit {
                scheduler.attach_hit_cues(
                    Arc::clone(&table),
                    first,
                    table.start_pos_offset() + self.settings.offset_secs(),
                );
            }
            scheduler.pass(now, self.sink.as_ref());
        }
        self.timer = Some(LookaheadTimer::start(
            Arc::clone(&self.scheduler),
            Arc::clone(&self.clock),
            Arc::clone(&self.sink),
            Duration::from_millis(self.config.lookahead_tick_ms),
        )?);

        log::info!(
            "session {} started at block {start_block}: {} subdivisions, {} input beats, {} bpm",
            self.generation,
            table.len(),
            table.actual_beats().len(),
            self.bpm
        );

        self.run = Some(Run {
            judged: vec![false; table.len()],
            pending_misses: Vec::new(),
            next_expected: Cursor::new(first),
            visual: VisualSync::new(first, self.config.max_frame_batch),
            table,
            track_start,
            start_block,
            finished: false,
        });
        Ok(())
    }

    /// Stop playback and discard the run. Does nothing when idle.
    pub fn reset(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        if self.run.take().is_some() {
            self.scheduler().detach_hit_cues();
            self.sink.stop_all();
            // In-flight replies belong to the run that just ended.
            self.generation += 1;
            log::info!("session stopped");
        }
    }

    /// Alias for [`Session::reset`].
    pub fn stop(&mut self) {
        self.reset();
    }

    /// Judge an input made at audio-clock time `t`.
    ///
    /// The result arrives asynchronously and is shown by a later `frame`.
    pub fn judge_hit(&mut self, t: f64) -> Result<(), EngineError> {
        if self.settings.play_hitsounds_on_hit {
            self.sink.play(CuePlay::new(
                Cue::Hit,
                self.clock.now(),
                self.settings.hitsound_gain(),
            ));
        }
        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };

        let input = t + run.table.start_pos_offset();
        let swept = self.sweeper.sweep(&run.table, &mut run.next_expected, input);
        run.pending_misses.extend(swept);

        if !self.listening {
            while run
                .table
                .get(run.next_expected.get())
                .is_some_and(|e| e.is_silent())
            {
                run.next_expected.step();
            }
        }

        let index = run.next_expected.get();
        let expected = run.table.get(index).map_or(f64::NAN, |e| e.timestamp);
        self.worker.send(JudgeRequest::Hit {
            generation: self.generation,
            input,
            index,
            expected,
        })
    }

    /// Change the tempo. The metronome keeps its phase.
    ///
    /// A running table keeps its timestamps; the new tempo applies to the
    /// metronome now and to the table of the next `start`.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), EngineError> {
        validate_bpm(bpm)?;
        self.scheduler().set_bpm(bpm)?;
        self.bpm = bpm;
        Ok(())
    }

    /// Per-frame work: advance visuals, sweep misses, dispatch replies.
    pub fn frame(&mut self, target: &mut dyn RenderTarget) -> FrameStatus {
        let replies = self.worker.drain();
        let listening = self.listening;

        let (step, auto_hits) = {
            let Some(run) = self.run.as_mut() else {
                return FrameStatus::Idle;
            };
            let now = self.clock.now() + run.table.start_pos_offset();

            // Self-judged entries are collected before the sweep so a stalled
            // frame cannot sweep them past unjudged.
            let step = run
                .visual
                .step(&run.table, &self.chart, now, listening, target);
            let auto_hits: Vec<(usize, f64)> = step
                .auto_hits
                .iter()
                .copied()
                .filter(|&(index, _)| run.mark(index))
                .collect();

            let swept = self.sweeper.sweep(&run.table, &mut run.next_expected, now);
            let mut missed: Vec<usize> = std::mem::take(&mut run.pending_misses);
            missed.extend(swept);
            for index in missed {
                let Some(entry) = run.table.get(index).copied() else {
                    continue;
                };
                if entry.is_silent() || entry.is_auto || listening || !run.mark(index) {
                    continue;
                }
                target.beat_missed(DotRef {
                    block: entry.block,
                    pip: entry.pip,
                });
            }

            (step, auto_hits)
        };

        for &bpm in &step.tempo_changes {
            match self.scheduler().set_bpm(bpm) {
                Ok(_) => {
                    log::info!("tempo change to {bpm} bpm");
                    target.tempo_changed(bpm);
                }
                Err(e) => log::warn!("tempo change ignored: {e}"),
            }
        }

        for (index, timestamp) in auto_hits {
            if let Err(e) = self.worker.send(JudgeRequest::Hit {
                generation: self.generation,
                input: timestamp,
                index,
                expected: timestamp,
            }) {
                log::warn!("auto hit {index} not sent: {e}");
            }
        }

        for reply in replies {
            self.dispatch(reply, target);
        }

        if step.finished {
            let newly_finished = self.run.as_mut().is_some_and(|run| {
                let first = !run.finished;
                run.finished = true;
                first
            });
            if newly_finished {
                if let Some(mut timer) = self.timer.take() {
                    timer.stop();
                }
                log::info!("all subdivisions processed, metronome stopped");
            }
            FrameStatus::Finished
        } else if step.behind {
            FrameStatus::Behind
        } else {
            FrameStatus::Running
        }
    }

    fn dispatch(&mut self, reply: JudgeReply, target: &mut dyn RenderTarget) {
        if reply.generation != self.generation {
            log::debug!(
                "dropping reply from generation {} (current {})",
                reply.generation,
                self.generation
            );
            return;
        }
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let len = run.table.len();

        match reply.reply {
            Reply::Finished => log::debug!("judgement past the end of the schedule"),
            Reply::SilentHit { index, target: dot, .. } => {
                if index >= len {
                    log::debug!("{}", EngineError::StaleWorkerReply { index, len });
                    return;
                }
                run.mark(index);
                run.next_expected.advance_to(index + 1);
                target.flash_pip(dot);
            }
            Reply::Judged {
                index,
                tier,
                target: dot,
                delta,
            } => {
                if index >= len {
                    log::debug!("{}", EngineError::StaleWorkerReply { index, len });
                    return;
                }
                run.mark(index);
                if tier.is_hit() {
                    run.next_expected.advance_to(index + 1);
                }
                target.show_judgement(Judgement {
                    index,
                    tier,
                    target: dot,
                    delta,
                });
            }
        }
    }

    /// Wait up to `timeout` for one reply and dispatch it.
    ///
    /// Returns whether a reply arrived. For headless drivers and tests.
    pub fn wait_reply(&mut self, timeout: Duration, target: &mut dyn RenderTarget) -> bool {
        match self.worker.wait(timeout) {
            Some(reply) => {
                self.dispatch(reply, target);
                true
            }
            None => false,
        }
    }

    /// Backing track timing for the current run.
    pub fn backing_track(&self) -> Option<BackingTrack> {
        self.run.as_ref().map(|run| BackingTrack {
            start_at: run.track_start,
            seek: run.table.start_pos_offset(),
        })
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current tempo as held by the conductor.
    pub fn bpm(&self) -> f64 {
        self.scheduler().conductor().bpm()
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// Timing table of the current run.
    pub fn table(&self) -> Option<Arc<TimingTable>> {
        self.run.as_ref().map(|run| Arc::clone(&run.table))
    }

    pub fn next_expected_index(&self) -> Option<usize> {
        self.run.as_ref().map(|run| run.next_expected.get())
    }

    pub fn visual_index(&self) -> Option<usize> {
        self.run.as_ref().map(|run| run.visual.index())
    }

    pub fn start_block(&self) -> Option<usize> {
        self.run.as_ref().map(|run| run.start_block)
    }

    /// Whether the lookahead timer is running.
    pub fn metronome_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| t.is_running())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reset();
        self.worker.shutdown();
    }
}
