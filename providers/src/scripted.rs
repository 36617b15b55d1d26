//! Deterministic bridge for tests and demos.
//!
//! Replies are consumed in order from a script. Every request is recorded so
//! tests can assert whether (and with which candidates) the bridge was
//! consulted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{BridgeError, BridgeFut, BridgeReply, BridgeRequest, LlmBridge, check_bounded, schema};

#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(BridgeReply),
    /// Raw model text, parsed through the reply schema.
    Raw(String),
    Error(BridgeError),
    /// Wait before producing the inner step.
    Delayed(Duration, Box<Scripted>),
    /// Never completes.
    Hang,
}

impl Scripted {
    #[must_use]
    pub fn select(choice_id: impl Into<String>) -> Self {
        Self::Reply(BridgeReply::Select {
            choice_id: choice_id.into(),
        })
    }

    #[must_use]
    pub fn delayed(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    steps: VecDeque<Scripted>,
    requests: Vec<BridgeRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedBridge {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBridge {
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                steps: steps.into_iter().collect(),
                requests: Vec::new(),
            })),
        }
    }

    pub fn push(&self, step: Scripted) {
        if let Ok(mut state) = self.state.lock() {
            state.steps.push_back(step);
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.lock().map(|s| s.requests.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<BridgeRequest> {
        self.state
            .lock()
            .map(|s| s.requests.clone())
            .unwrap_or_default()
    }

    fn next_step(&self, request: &BridgeRequest) -> Option<Scripted> {
        let mut state = self.state.lock().ok()?;
        state.requests.push(request.clone());
        state.steps.pop_front()
    }
}

async fn play(step: Scripted, request: &BridgeRequest) -> Result<BridgeReply, BridgeError> {
    let mut step = step;
    loop {
        match step {
            Scripted::Reply(reply) => return check_bounded(request, reply),
            Scripted::Raw(raw) => {
                return check_bounded(request, schema::parse_reply(request.task, &raw));
            }
            Scripted::Error(err) => return Err(err),
            Scripted::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                step = *inner;
            }
            Scripted::Hang => std::future::pending::<()>().await,
        }
    }
}

impl LlmBridge for ScriptedBridge {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn call<'a>(&'a self, request: &'a BridgeRequest) -> BridgeFut<'a> {
        let step = self.next_step(request);
        Box::pin(async move {
            match step {
                Some(step) => play(step, request).await,
                None => Err(BridgeError::Unavailable("script exhausted".to_string())),
            }
        })
    }
}
