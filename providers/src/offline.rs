//! Bridge used when no model is configured.
//!
//! It never selects among candidates, so ambiguous selections always land on
//! the grounded clarifier. The only thing it answers is the local time.

use chrono::Local;

use crate::{BridgeError, BridgeFut, BridgeReply, BridgeRequest, BridgeTask, LlmBridge};
use waypoint_types::GeneralTopic;

const TIME_QUESTIONS: &[&str] = &[
    "what time is it",
    "what's the time",
    "whats the time",
    "current time",
    "time now",
    "what is the time",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBridge;

impl OfflineBridge {
    fn reply(request: &BridgeRequest) -> Result<BridgeReply, BridgeError> {
        if request.task == BridgeTask::Classify && is_time_question(&request.user_message) {
            return Ok(BridgeReply::GeneralAnswer {
                topic: GeneralTopic::Time,
                answer: format!("It's {}.", Local::now().format("%H:%M")),
            });
        }
        Err(BridgeError::Unavailable("no model configured".to_string()))
    }
}

fn is_time_question(message: &str) -> bool {
    let lowered = message.to_lowercase();
    let trimmed = lowered.trim().trim_end_matches(['?', '.', '!']);
    TIME_QUESTIONS.iter().any(|q| trimmed == *q || trimmed.starts_with(q))
}

impl LlmBridge for OfflineBridge {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn call<'a>(&'a self, request: &'a BridgeRequest) -> BridgeFut<'a> {
        let reply = Self::reply(request);
        Box::pin(async move { reply })
    }
}
