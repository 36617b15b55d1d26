use waypoint_core::SessionEffect;
use waypoint_core::ordinal::is_ordinal;
use waypoint_providers::{BridgeError, BridgeReply, BridgeRequest};
use waypoint_types::Resolution;

use crate::decision::{ClarifyReason, Decision};
use crate::tier::{Consultation, Tier, TierContext, TierOutcome};

const OUT_OF_SCOPE: &str = "That's outside what I can help with here.";

/// General intent classification: time, math, static knowledge, or out of
/// scope. The only tier that may ask for a larger context window.
pub struct GeneralTier;

impl Tier for GeneralTier {
    fn name(&self) -> &'static str {
        "general"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        // A bare ordinal with nothing to select is not a question.
        if is_ordinal(cx.input, false) {
            return TierOutcome::PassThrough;
        }
        let request = BridgeRequest::classify(cx.turn, cx.input, cx.chat.clone(), cx.ui.clone())
            .with_extended_context(cx.extended);
        TierOutcome::Consult(Consultation {
            request,
            candidates: Vec::new(),
            source: None,
        })
    }

    fn resume(
        &self,
        cx: &TierContext<'_>,
        _consultation: Consultation,
        reply: Result<BridgeReply, BridgeError>,
    ) -> TierOutcome {
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!(turn = %cx.turn, error = %err, "Classification unavailable");
                return TierOutcome::PassThrough;
            }
        };

        let decision = match reply {
            BridgeReply::GeneralAnswer { topic, answer } => {
                let resolution = Resolution::GeneralAnswer {
                    topic,
                    answer: answer.clone(),
                };
                Decision::answer(resolution, answer)
            }
            BridgeReply::AnswerFromContext { answer } => Decision::from_context(answer),
            BridgeReply::OutOfScope { reason } => {
                let reason = reason.unwrap_or_else(|| OUT_OF_SCOPE.to_string());
                Decision::answer(Resolution::Unsupported { reason: reason.clone() }, reason)
            }
            BridgeReply::NeedMoreInfo {
                question: Some(question),
            } if !question.trim().is_empty() => {
                Decision::clarify(ClarifyReason::FollowUp, question.clone()).with_effect(
                    SessionEffect::EnterClarification {
                        question,
                        pending_position: None,
                    },
                )
            }
            BridgeReply::NeedContext => return TierOutcome::NeedContext,
            other => {
                tracing::debug!(
                    turn = %cx.turn,
                    intent = other.intent(),
                    "Classification inconclusive"
                );
                return TierOutcome::PassThrough;
            }
        };
        TierOutcome::Handled(decision)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::decision::ReplyKind;
    use crate::tiers::testing::Fixture;
    use waypoint_providers::BridgeTask;
    use waypoint_types::GeneralTopic;

    fn consult(fixture: &Fixture, input: &str) -> Consultation {
        match GeneralTier.evaluate(&fixture.cx(input)) {
            TierOutcome::Consult(consultation) => consultation,
            other => panic!("expected a consultation, got {other:?}"),
        }
    }

    #[test]
    fn classifies_with_ui_context() {
        let fixture = Fixture::default();
        let consultation = consult(&fixture, "what's 2 + 2?");
        assert_eq!(consultation.request.task, BridgeTask::Classify);
        assert!(consultation.request.ui_context.is_some());
        assert!(!consultation.request.extended_context);
    }

    #[test]
    fn general_answer_resolves() {
        let fixture = Fixture::default();
        let cx = fixture.cx("what's 2 + 2?");
        let outcome = GeneralTier.resume(
            &cx,
            consult(&fixture, "what's 2 + 2?"),
            Ok(BridgeReply::GeneralAnswer {
                topic: GeneralTopic::Math,
                answer: "4".to_string(),
            }),
        );
        let TierOutcome::Handled(decision) = outcome else {
            panic!("general answer must be handled");
        };
        assert_eq!(decision.kind, ReplyKind::Answer);
        assert_eq!(decision.reply, "4");
    }

    #[test]
    fn out_of_scope_is_unsupported() {
        let fixture = Fixture::default();
        let cx = fixture.cx("book me a flight");
        let outcome = GeneralTier.resume(
            &cx,
            consult(&fixture, "book me a flight"),
            Ok(BridgeReply::OutOfScope { reason: None }),
        );
        assert!(matches!(
            outcome,
            TierOutcome::Handled(Decision {
                resolution: Some(Resolution::Unsupported { .. }),
                ..
            })
        ));
    }

    #[test]
    fn follow_up_opens_clarification() {
        let fixture = Fixture::default();
        let cx = fixture.cx("what's the weather like?");
        let outcome = GeneralTier.resume(
            &cx,
            consult(&fixture, "what's the weather like?"),
            Ok(BridgeReply::NeedMoreInfo {
                question: Some("Which city?".to_string()),
            }),
        );
        let TierOutcome::Handled(decision) = outcome else {
            panic!("follow-up must be handled");
        };
        assert_eq!(decision.kind, ReplyKind::Clarify(ClarifyReason::FollowUp));
        assert!(matches!(
            decision.effects.as_slice(),
            [SessionEffect::EnterClarification { pending_position: None, .. }]
        ));
    }

    #[test]
    fn need_context_bubbles_up() {
        let fixture = Fixture::default();
        let cx = fixture.cx("what was that thing earlier");
        let consultation = consult(&fixture, "what was that thing earlier");
        let outcome = GeneralTier.resume(&cx, consultation, Ok(BridgeReply::NeedContext));
        assert!(matches!(outcome, TierOutcome::NeedContext));
    }

    #[test]
    fn errors_fall_through() {
        let fixture = Fixture::default();
        let cx = fixture.cx("tell me a joke");
        let outcome = GeneralTier.resume(
            &cx,
            consult(&fixture, "tell me a joke"),
            Err(BridgeError::Timeout {
                elapsed: Duration::from_secs(4),
            }),
        );
        assert!(matches!(outcome, TierOutcome::PassThrough));
    }
}
