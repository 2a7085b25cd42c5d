//! Lookahead timer — re-runs the scheduler pass on a dedicated thread.
//!
//! The thread sleeps for one tick between passes. Stopping sets the flag,
//! wakes the thread and joins it, so no pass can run after `stop` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::scheduler::AudioScheduler;
use crate::audio::{AudioClock, CueSink};
use crate::error::EngineError;

/// Running lookahead loop.
pub struct LookaheadTimer {
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl LookaheadTimer {
    /// Start calling [`AudioScheduler::pass`] every `tick`.
    pub fn start(
        scheduler: Arc<Mutex<AudioScheduler>>,
        clock: Arc<dyn AudioClock>,
        sink: Arc<dyn CueSink>,
        tick: Duration,
    ) -> Result<Self, EngineError> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop_flag);

        let thread = thread::Builder::new()
            .name("beatblocks-lookahead".into())
            .spawn(move || loop {
                thread::park_timeout(tick);
                if stop_clone.load(Ordering::Acquire) {
                    break;
                }
                let mut scheduler = scheduler.lock().unwrap_or_else(|e| e.into_inner());
                scheduler.pass(clock.now(), sink.as_ref());
            })
            .map_err(|source| EngineError::Spawn {
                name: "lookahead timer",
                source,
            })?;

        Ok(Self {
            stop_flag,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Cancel the pending pass and join the thread. Safe to call twice.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}

impl Drop for LookaheadTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{CueLog, ManualClock};
    use crate::timing::Conductor;

    fn shared(bpm: f64) -> Arc<Mutex<AudioScheduler>> {
        let mut scheduler = AudioScheduler::new(Conductor::new(bpm).unwrap(), 0.1);
        scheduler.reset(0.0, 0);
        Arc::new(Mutex::new(scheduler))
    }

    #[test]
    fn timer_runs_passes_until_stopped() {
        let scheduler = shared(120.0);
        let clock = Arc::new(ManualClock::new(0.0));
        let log = CueLog::new();
        let mut timer = LookaheadTimer::start(
            Arc::clone(&scheduler),
            clock.clone(),
            Arc::new(log.clone()),
            Duration::from_millis(1),
        )
        .unwrap();

        clock.set(1.0);
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while log.plays().len() < 3 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        timer.stop();
        assert!(!timer.is_running());

        let count = log.plays().len();
        assert_eq!(count, 3);
        clock.set(5.0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(log.plays().len(), count);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut timer = LookaheadTimer::start(
            shared(120.0),
            Arc::new(ManualClock::new(0.0)),
            Arc::new(CueLog::new()),
            Duration::from_millis(25),
        )
        .unwrap();
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());
    }

    #[test]
    fn drop_cancels_timer() {
        let log = CueLog::new();
        let clock = Arc::new(ManualClock::new(0.0));
        {
            let _timer = LookaheadTimer::start(
                shared(120.0),
                clock.clone(),
                Arc::new(log.clone()),
                Duration::from_millis(1),
            )
            .unwrap();
        }
        let before = log.plays().len();
        clock.set(10.0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(log.plays().len(), before);
    }
}
