//! Session lifecycle — start, judge, frame and reset against a hand-driven
//! clock and a recording cue sink. No audio hardware involved.

use std::sync::Arc;
use std::time::Duration;

use assert_approx_eq::assert_approx_eq;

use beatblocks::audio::{Cue, CueLog, ManualClock};
use beatblocks::chart::{Block, Chart};
use beatblocks::config::{EngineConfig, Settings};
use beatblocks::judge::{DotRef, Tier};
use beatblocks::playback::{FrameStatus, RenderEvent, RenderLog, Session};

const TIMEOUT: Duration = Duration::from_secs(2);

struct Rig {
    session: Session,
    clock: Arc<ManualClock>,
    cues: CueLog,
    target: RenderLog,
}

/// Helper: a session with no count-in and a slow lookahead tick so only
/// the synchronous first pass submits cues during a test.
fn rig(chart: Chart, bpm: f64, settings: Settings) -> Rig {
    let clock = Arc::new(ManualClock::new(0.0));
    let cues = CueLog::new();
    let config = EngineConfig {
        countdown_beats: 0,
        lookahead_tick_ms: 60_000,
        ..EngineConfig::default()
    };
    let session = Session::new(
        chart,
        bpm,
        config,
        settings,
        clock.clone(),
        Arc::new(cues.clone()),
    )
    .unwrap();
    Rig {
        session,
        clock,
        cues,
        target: RenderLog::new(),
    }
}

/// Helper: dispatch replies until `count` judgements have been shown.
fn collect_judgements(rig: &mut Rig, count: usize) {
    while rig.target.judgements().len() < count {
        if !rig.session.wait_reply(TIMEOUT, &mut rig.target) {
            break;
        }
    }
}

fn ones(n: usize) -> Chart {
    Chart::new(vec![Block::new(1); n])
}

#[test]
fn player_run_reports_hits_and_misses() {
    let mut rig = rig(ones(4), 60.0, Settings::default());
    rig.session.start(0).unwrap();

    rig.session.judge_hit(0.02).unwrap();
    collect_judgements(&mut rig, 1);
    rig.session.judge_hit(1.07).unwrap();
    collect_judgements(&mut rig, 2);
    assert_eq!(rig.session.next_expected_index(), Some(2));

    // Beat 2 passes untouched.
    rig.clock.set(2.5);
    assert_eq!(rig.session.frame(&mut rig.target), FrameStatus::Running);
    assert_eq!(rig.target.misses(), 1);
    assert!(rig
        .target
        .events
        .contains(&RenderEvent::Missed(DotRef { block: 2, pip: 0 })));

    rig.session.judge_hit(3.1).unwrap();
    collect_judgements(&mut rig, 3);

    let judged = rig.target.judgements();
    let tiers: Vec<Tier> = judged.iter().map(|j| j.tier).collect();
    assert_eq!(tiers, vec![Tier::Perfect, Tier::Good, Tier::Ok]);
    let indices: Vec<usize> = judged.iter().map(|j| j.index).collect();
    assert_eq!(indices, vec![0, 1, 3]);
    assert_approx_eq!(judged[0].delta, 0.02);
    assert_eq!(rig.session.next_expected_index(), Some(4));

    rig.clock.set(3.5);
    assert_eq!(rig.session.frame(&mut rig.target), FrameStatus::Finished);
    assert!(!rig.session.metronome_running());
    assert_eq!(rig.target.misses(), 1);
}

#[test]
fn listening_run_judges_itself() {
    let mut rig = rig(ones(4), 120.0, Settings::default());
    rig.session.set_listening(true);
    rig.session.start(0).unwrap();

    let mut status = FrameStatus::Running;
    let mut now = 0.0;
    while now <= 2.0 {
        rig.clock.set(now);
        status = rig.session.frame(&mut rig.target);
        now += 0.05;
    }
    assert_eq!(status, FrameStatus::Finished);

    collect_judgements(&mut rig, 4);
    let judged = rig.target.judgements();
    assert_eq!(judged.len(), 4);
    assert!(judged.iter().all(|j| j.tier == Tier::Perfect && j.delta == 0.0));
    assert_eq!(rig.target.misses(), 0);
    assert_eq!(rig.target.pips().len(), 4);
}

#[test]
fn auto_block_is_never_missed() {
    let chart = Chart::new(vec![Block::new(1), Block::new(2).auto(), Block::new(1)]);
    let mut rig = rig(chart, 60.0, Settings::default());
    rig.session.start(0).unwrap();

    let mut now = 0.0;
    while now <= 4.0 {
        rig.clock.set(now);
        rig.session.frame(&mut rig.target);
        now += 0.05;
    }
    collect_judgements(&mut rig, 2);

    // Blocks 0 and 2 need input and were missed; block 1 judged itself.
    assert_eq!(rig.target.misses(), 2);
    let judged = rig.target.judgements();
    assert_eq!(judged.len(), 2);
    assert!(judged.iter().all(|j| j.target.block == 1));
}

#[test]
fn start_block_sets_cursors_and_backing_track() {
    let config = EngineConfig {
        lookahead_tick_ms: 60_000,
        ..EngineConfig::default()
    };
    let clock = Arc::new(ManualClock::new(10.0));
    let cues = CueLog::new();
    let mut session = Session::new(
        ones(8),
        120.0,
        config,
        Settings::default(),
        clock.clone(),
        Arc::new(cues.clone()),
    )
    .unwrap();

    session.start(4).unwrap();
    assert_eq!(session.next_expected_index(), Some(4));
    assert_eq!(session.visual_index(), Some(4));

    // Four count-in beats at 0.5 s, then block 4 sounds at the track start.
    let track = session.backing_track().unwrap();
    assert_approx_eq!(track.start_at, 12.0);
    assert_approx_eq!(track.seek, 2.0);

    let table = session.table().unwrap();
    assert_approx_eq!(table.entries()[4].timestamp, 14.0);

    let ticks = cues.plays_of(Cue::Metronome);
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0].at, 10.0);
    assert!(cues.plays_of(Cue::Hit).is_empty());
}

#[test]
fn offset_shifts_schedule_and_hit_cues() {
    let settings = Settings {
        offset_ms: 100.0,
        ..Settings::default()
    };
    let mut rig = rig(ones(2), 60.0, settings);
    rig.session.start(0).unwrap();

    let table = rig.session.table().unwrap();
    assert_approx_eq!(table.entries()[0].timestamp, 0.1);
    let hits = rig.cues.plays_of(Cue::Hit);
    assert_eq!(hits.len(), 1);
    assert_approx_eq!(hits[0].at, 0.0);

    rig.session.judge_hit(0.1).unwrap();
    collect_judgements(&mut rig, 1);
    assert_eq!(rig.target.judgements()[0].tier, Tier::Perfect);
}

#[test]
fn hitsounds_on_hit_replace_scheduled_cues() {
    let settings = Settings {
        play_hitsounds_on_hit: true,
        ..Settings::default()
    };
    let mut rig = rig(ones(2), 60.0, settings);
    rig.session.start(0).unwrap();
    assert!(rig.cues.plays_of(Cue::Hit).is_empty());

    rig.clock.set(0.01);
    rig.session.judge_hit(0.01).unwrap();
    let hits = rig.cues.plays_of(Cue::Hit);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].at, 0.01);
}

#[test]
fn tempo_change_block_reaches_conductor() {
    let chart = Chart::new(vec![Block::new(1), Block::new(1).bpm(60.0)]);
    let mut rig = rig(chart, 120.0, Settings::default());
    rig.session.start(0).unwrap();
    assert_eq!(rig.session.bpm(), 120.0);

    rig.clock.set(0.2);
    rig.session.frame(&mut rig.target);
    assert_eq!(rig.session.bpm(), 120.0);

    rig.clock.set(0.6);
    rig.session.frame(&mut rig.target);
    assert_eq!(rig.session.bpm(), 60.0);
    assert!(rig.target.events.contains(&RenderEvent::Tempo(60.0)));
}

#[test]
fn reset_is_idempotent_and_drops_inflight_replies() {
    let mut rig = rig(ones(2), 60.0, Settings::default());
    rig.session.reset();
    assert_eq!(rig.cues.stops(), 0);

    rig.session.start(0).unwrap();
    let generation = rig.session.generation();
    rig.session.judge_hit(0.0).unwrap();
    rig.session.reset();
    rig.session.reset();
    assert_eq!(rig.cues.stops(), 1);
    assert_eq!(rig.session.generation(), generation + 1);
    assert!(!rig.session.is_running());

    assert!(rig.session.wait_reply(TIMEOUT, &mut rig.target));
    assert!(rig.target.judgements().is_empty());
    assert_eq!(rig.session.frame(&mut rig.target), FrameStatus::Idle);
}

#[test]
fn restart_after_tempo_change_uses_new_tempo() {
    let mut rig = rig(ones(2), 120.0, Settings::default());
    rig.session.start(0).unwrap();
    rig.session.set_tempo(60.0).unwrap();
    assert!(rig.session.set_tempo(0.0).is_err());

    rig.session.start(0).unwrap();
    let table = rig.session.table().unwrap();
    assert_approx_eq!(table.entries()[1].timestamp, 1.0);
}

#[test]
fn malformed_blocks_still_play() {
    let chart = Chart::new(vec![
        Block::with_sound_map(9, vec![1]),
        Block::with_sound_map(2, vec![1, 0, 1]),
    ]);
    let mut rig = rig(chart, 60.0, Settings::default());
    rig.session.start(0).unwrap();
    let table = rig.session.table().unwrap();
    assert_eq!(table.len(), 8);
    assert!(table.entries().iter().all(|e| e.volume == 1));
    assert_eq!(rig.session.chart().blocks[0].value, 6);
}

#[test]
fn empty_chart_finishes_immediately() {
    let mut rig = rig(Chart::new(vec![]), 120.0, Settings::default());
    rig.session.start(3).unwrap();
    assert_eq!(rig.session.frame(&mut rig.target), FrameStatus::Finished);
    rig.session.judge_hit(0.0).unwrap();
    assert!(rig.session.wait_reply(TIMEOUT, &mut rig.target));
    assert!(rig.target.judgements().is_empty());
}

#[test]
fn start_after_tempo_change_uses_changed_tempo() {
    let chart = Chart::new(vec![
        Block::new(1),
        Block::new(1).bpm(60.0),
        Block::new(1),
        Block::new(1),
    ]);
    let mut rig = rig(chart, 120.0, Settings::default());
    rig.session.start(2).unwrap();
    assert_eq!(rig.session.bpm(), 60.0);

    let table = rig.session.table().unwrap();
    let times: Vec<f64> = table.timestamps().collect();
    assert_eq!(times, vec![0.0, 0.5, 1.5, 2.5]);

    let mut now = 0.0;
    while now <= 2.0 {
        rig.clock.set(now);
        rig.session.frame(&mut rig.target);
        now += 0.05;
    }
    assert_eq!(rig.session.bpm(), 60.0);
    assert!(!rig.target.events.contains(&RenderEvent::Tempo(120.0)));

    // A restart from the top goes back to the chart's base tempo.
    rig.session.start(0).unwrap();
    assert_eq!(rig.session.bpm(), 120.0);
}

#[test]
fn start_block_with_its_own_tempo_change() {
    let chart = Chart::new(vec![Block::new(1), Block::new(2).bpm(90.0)]);
    let mut rig = rig(chart, 120.0, Settings::default());
    rig.session.start(1).unwrap();
    assert_eq!(rig.session.bpm(), 90.0);
}

#[test]
fn stalled_frame_still_judges_auto_blocks() {
    let mut rig = rig(
        Chart::new(vec![Block::new(1).auto(); 4]),
        60.0,
        Settings::default(),
    );
    rig.session.start(0).unwrap();

    rig.session.frame(&mut rig.target);
    rig.clock.set(3.5);
    rig.session.frame(&mut rig.target);
    collect_judgements(&mut rig, 4);

    let judged = rig.target.judgements();
    let indices: Vec<usize> = judged.iter().map(|j| j.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(judged.iter().all(|j| j.tier == Tier::Perfect));
    assert_eq!(rig.target.misses(), 0);
}

#[test]
fn stalled_frame_in_listening_mode_reports_no_misses() {
    let mut rig = rig(ones(4), 60.0, Settings::default());
    rig.session.set_listening(true);
    rig.session.start(0).unwrap();

    rig.session.frame(&mut rig.target);
    rig.clock.set(3.5);
    rig.session.frame(&mut rig.target);
    collect_judgements(&mut rig, 4);

    assert_eq!(rig.target.judgements().len(), 4);
    assert_eq!(rig.target.misses(), 0);
}

#[test]
fn stall_past_batch_cap_judges_on_later_frames() {
    let clock = Arc::new(ManualClock::new(0.0));
    let config = EngineConfig {
        countdown_beats: 0,
        lookahead_tick_ms: 60_000,
        max_frame_batch: 2,
        ..EngineConfig::default()
    };
    let mut session = Session::new(
        Chart::new(vec![Block::new(1).auto(); 5]),
        60.0,
        config,
        Settings::default(),
        clock.clone(),
        Arc::new(CueLog::new()),
    )
    .unwrap();
    let mut target = RenderLog::new();
    session.start(0).unwrap();

    clock.set(10.0);
    assert_eq!(session.frame(&mut target), FrameStatus::Behind);
    assert_eq!(session.frame(&mut target), FrameStatus::Behind);
    assert_eq!(session.frame(&mut target), FrameStatus::Finished);

    while target.judgements().len() < 5 {
        if !session.wait_reply(TIMEOUT, &mut target) {
            break;
        }
    }
    assert_eq!(target.judgements().len(), 5);
    assert_eq!(target.misses(), 0);
}
