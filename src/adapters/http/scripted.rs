//! Scripted transport for tests and offline demos.
//!
//! Plays back a queue of steps, one per call; the last step repeats once the queue
//! runs dry. Records every request so callers can count attempts.

use crate::domain::{DomainError, HttpRequest, HttpResponse};
use crate::ports::HttpTransport;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub enum Step {
    Respond(HttpResponse),
    /// Respond after a delay; still honours cancellation.
    RespondAfter(Duration, HttpResponse),
    Fail(DomainError),
    /// Never respond; returns `Aborted` once the token fires.
    Hang,
}

impl Step {
    pub fn json(status: u16, value: Value) -> Self {
        Step::Respond(HttpResponse::json(status, &value))
    }

    pub fn status(status: u16) -> Self {
        Step::Respond(HttpResponse::new(status, Vec::new()))
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Same step for every call.
    pub fn always(step: Step) -> Self {
        Self::new([step])
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().push_back(step);
    }

    pub fn attempts(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    fn next_step(&self) -> Step {
        let next = self.steps.lock().pop_front();
        let mut last = self.last.lock();
        match next {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last.clone().unwrap_or_else(|| {
                Step::Fail(DomainError::Transport("no scripted response".into()))
            }),
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, DomainError> {
        self.requests.lock().push(request.clone());
        match self.next_step() {
            Step::Respond(response) => Ok(response),
            Step::RespondAfter(delay, response) => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(DomainError::Aborted),
                    _ = tokio::time::sleep(delay) => Ok(response),
                }
            }
            Step::Fail(err) => Err(err),
            Step::Hang => {
                cancel.cancelled().await;
                Err(DomainError::Aborted)
            }
        }
    }
}
