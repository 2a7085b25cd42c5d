//! Judgement worker — runs the engine on its own thread.
//!
//! Requests go in over one mpsc channel and replies come back over another.
//! The channel preserves submission order, so replies arrive in the order the
//! hits were made even under rapid input.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use super::engine::JudgementEngine;
use super::protocol::{JudgeReply, JudgeRequest};
use crate::error::EngineError;

/// Handle to the judgement thread.
pub struct JudgeWorker {
    requests: mpsc::Sender<JudgeRequest>,
    replies: mpsc::Receiver<JudgeReply>,
    thread: Option<JoinHandle<()>>,
}

impl JudgeWorker {
    /// Spawn the worker thread.
    pub fn spawn() -> Result<Self, EngineError> {
        let (request_tx, request_rx) = mpsc::channel::<JudgeRequest>();
        let (reply_tx, reply_rx) = mpsc::channel::<JudgeReply>();

        let thread = thread::Builder::new()
            .name("beatblocks-judge".into())
            .spawn(move || {
                let mut engine = JudgementEngine::new();
                while let Ok(request) = request_rx.recv() {
                    if matches!(request, JudgeRequest::Shutdown) {
                        break;
                    }
                    if let Some(reply) = engine.handle(request) {
                        if reply_tx.send(reply).is_err() {
                            break;
                        }
                    }
                }
                log::debug!("judge worker exiting");
            })
            .map_err(|source| EngineError::Spawn {
                name: "judge worker",
                source,
            })?;

        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            thread: Some(thread),
        })
    }

    /// Fire-and-forget submission.
    pub fn send(&self, request: JudgeRequest) -> Result<(), EngineError> {
        self.requests
            .send(request)
            .map_err(|_| EngineError::WorkerDisconnected)
    }

    /// Non-blocking poll for the next reply.
    pub fn poll(&self) -> Option<JudgeReply> {
        self.replies.try_recv().ok()
    }

    /// Drain all replies that have arrived so far.
    pub fn drain(&self) -> Vec<JudgeReply> {
        let mut replies = Vec::new();
        while let Ok(reply) = self.replies.try_recv() {
            replies.push(reply);
        }
        replies
    }

    /// Block until the next reply arrives or the timeout elapses.
    pub fn wait(&self, timeout: std::time::Duration) -> Option<JudgeReply> {
        self.replies.recv_timeout(timeout).ok()
    }

    /// Stop the worker and join its thread.
    pub fn shutdown(&mut self) {
        let _ = self.requests.send(JudgeRequest::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for JudgeWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
