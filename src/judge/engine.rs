//! Judgement engine — the worker's state machine, independent of threading.

use super::protocol::{JudgeInit, JudgeReply, JudgeRequest, Reply};

/// Holds the current session's schedule and answers hit requests.
#[derive(Debug, Default)]
pub struct JudgementEngine {
    generation: u64,
    data: Option<JudgeInit>,
}

impl JudgementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an `Init` has been received.
    pub fn is_initialised(&self) -> bool {
        self.data.is_some()
    }

    /// Handle one request. `Init` and `Shutdown` produce no reply; every
    /// `Hit` produces exactly one.
    pub fn handle(&mut self, request: JudgeRequest) -> Option<JudgeReply> {
        match request {
            JudgeRequest::Init { generation, data } => {
                log::debug!(
                    "judge init: generation {generation}, {} subdivisions",
                    data.subdivision_times.len()
                );
                self.generation = generation;
                self.data = Some(data);
                None
            }
            JudgeRequest::Hit {
                generation,
                input,
                index,
                expected,
            } => Some(JudgeReply {
                generation,
                reply: self.judge(input, index, expected),
            }),
            JudgeRequest::Shutdown => None,
        }
    }

    fn judge(&self, input: f64, index: usize, expected: f64) -> Reply {
        let Some(data) = &self.data else {
            return Reply::Finished;
        };
        if index >= data.subdivision_times.len() {
            return Reply::Finished;
        }
        let (Some(&volume), Some(&target)) = (data.volume_map.get(index), data.dot_map.get(index))
        else {
            return Reply::Finished;
        };

        if volume == 0 {
            return Reply::SilentHit {
                index,
                target,
                input,
            };
        }

        let delta = input - expected;
        let tier = data.thresholds.classify(delta);
        log::debug!("hit at {input:.4}, expected {expected:.4}, delta {delta:+.4} -> {tier:?}");
        Reply::Judged {
            index,
            tier,
            target,
            delta,
        }
    }
}
