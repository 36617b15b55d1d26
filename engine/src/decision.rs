//! What a tier hands back when it claims a turn.

use serde::Serialize;

use waypoint_core::SessionEffect;
use waypoint_types::{Candidate, Resolution};

/// Reply shown whenever referenced context has decayed.
pub const STALE_REPLY: &str = "I don't see that anymore, want me to show it again?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarifyReason {
    /// Several candidates fit; re-showing the same set.
    Ambiguous,
    /// A pure ordinal fits both chat options and a focused widget.
    WhichSource,
    OutOfRange,
    /// "Did you mean X?"
    Suggestion,
    /// The model asked a follow-up question.
    FollowUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ReplyKind {
    Action,
    Answer,
    Options,
    Clarify(ClarifyReason),
    Acknowledged,
    ContextStale,
    Unrecognized,
    /// The turn was superseded by a stop phrase and left no trace.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub resolution: Option<Resolution>,
    pub reply: String,
    /// Options shown with the reply.
    pub options: Vec<Candidate>,
    pub effects: Vec<SessionEffect>,
    pub kind: ReplyKind,
}

impl Decision {
    fn new(kind: ReplyKind, reply: impl Into<String>) -> Self {
        Self {
            resolution: None,
            reply: reply.into(),
            options: Vec::new(),
            effects: Vec::new(),
            kind,
        }
    }

    #[must_use]
    pub fn action(resolution: Resolution, reply: impl Into<String>) -> Self {
        Self {
            resolution: Some(resolution),
            ..Self::new(ReplyKind::Action, reply)
        }
    }

    #[must_use]
    pub fn answer(resolution: Resolution, reply: impl Into<String>) -> Self {
        Self {
            resolution: Some(resolution),
            ..Self::new(ReplyKind::Answer, reply)
        }
    }

    /// Answer from context; the reply and the resolution carry the same text.
    #[must_use]
    pub fn from_context(answer: impl Into<String>) -> Self {
        let answer = answer.into();
        Self::answer(
            Resolution::AnswerFromContext {
                answer: answer.clone(),
            },
            answer,
        )
    }

    #[must_use]
    pub fn options(reply: impl Into<String>, options: Vec<Candidate>) -> Self {
        Self {
            options,
            ..Self::new(ReplyKind::Options, reply)
        }
    }

    #[must_use]
    pub fn clarify(reason: ClarifyReason, reply: impl Into<String>) -> Self {
        Self::new(ReplyKind::Clarify(reason), reply)
    }

    #[must_use]
    pub fn acknowledge(reply: impl Into<String>) -> Self {
        Self::new(ReplyKind::Acknowledged, reply)
    }

    #[must_use]
    pub fn stale() -> Self {
        Self::new(ReplyKind::ContextStale, STALE_REPLY)
    }

    #[must_use]
    pub fn stale_with(reply: impl Into<String>) -> Self {
        Self::new(ReplyKind::ContextStale, reply)
    }

    #[must_use]
    pub fn unrecognized(reply: impl Into<String>) -> Self {
        Self::new(ReplyKind::Unrecognized, reply)
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<Candidate>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: SessionEffect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = SessionEffect>) -> Self {
        self.effects.extend(effects);
        self
    }
}
