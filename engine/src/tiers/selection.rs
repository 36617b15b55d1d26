use waypoint_core::{Arbitration, SelectionSource, SessionEffect, StaleTarget, arbitrate};
use waypoint_providers::{BridgeError, BridgeReply};
use waypoint_types::candidate::labels;
use waypoint_types::text::join_labels;
use waypoint_types::{Candidate, HistoryEntry, HistoryKind, Resolution};

use crate::decision::{ClarifyReason, Decision};
use crate::ladder;
use crate::tier::{Consultation, Tier, TierContext, TierOutcome};
use crate::tiers::action_reply;

const WHICH_ONE: &str = "Which one did you mean?";

/// Selection and scope arbitration, escalating through the ladder when the
/// deterministic pass is inconclusive.
pub struct SelectionTier;

fn select(source: &SelectionSource, candidate: &Candidate, cx: &TierContext<'_>) -> Decision {
    let action = candidate.action.clone();
    let entry = HistoryEntry::for_action(HistoryKind::Select, &action, cx.now);
    let scoped = match source {
        SelectionSource::Chat(_) => SessionEffect::ClearPendingOptions,
        SelectionSource::Widget { id, title } => SessionEffect::EngageLatch {
            widget_id: id.clone(),
            title: title.clone(),
        },
    };
    Decision::action(Resolution::from(action.clone()), action_reply(&action)).with_effects([
        SessionEffect::RecordRequest(entry),
        SessionEffect::ExitClarification,
        scoped,
    ])
}

fn stale(target: &StaleTarget) -> Decision {
    match target {
        StaleTarget::ChatOptions => Decision::stale(),
        StaleTarget::Widget { title, .. } if !title.is_empty() => {
            Decision::stale_with(format!("{title} has nothing to select right now."))
        }
        StaleTarget::Widget { .. } => Decision::stale(),
    }
}

fn source_name(source: &SelectionSource) -> String {
    match source {
        SelectionSource::Chat(_) => "the chat options".to_string(),
        SelectionSource::Widget { title, .. } => title.clone(),
    }
}

impl Tier for SelectionTier {
    fn name(&self) -> &'static str {
        "selection"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        match arbitrate(cx.input, cx.state, cx.ui, cx.vocabulary, cx.tuning, cx.now) {
            Arbitration::PassThrough => TierOutcome::PassThrough,
            Arbitration::Select {
                source, candidate, ..
            } => TierOutcome::Handled(select(&source, &candidate, cx)),
            Arbitration::Ambiguous {
                source,
                candidates,
                remainder,
            } => {
                if let Some(index) =
                    ladder::relaxed_pick(&remainder, &candidates, &cx.tuning.thresholds)
                    && let Some(candidate) = candidates.get(index)
                {
                    tracing::debug!(turn = %cx.turn, index, "Relaxed pass resolved selection");
                    return TierOutcome::Handled(select(&source, candidate, cx));
                }
                if remainder.is_empty() {
                    return TierOutcome::Handled(ladder::grounded_clarifier(
                        &source,
                        &candidates,
                        WHICH_ONE,
                        ClarifyReason::Ambiguous,
                    ));
                }
                TierOutcome::Consult(ladder::consult_select(cx, &remainder, source, candidates))
            }
            Arbitration::OutOfRange {
                source,
                requested,
                candidates,
            } => {
                let question = format!(
                    "There {} only {} in {}, so I can't pick number {requested}. Which one did you mean?",
                    if candidates.len() == 1 { "is" } else { "are" },
                    match candidates.len() {
                        1 => "1 option".to_string(),
                        n => format!("{n} options"),
                    },
                    source_name(&source),
                );
                TierOutcome::Handled(ladder::grounded_clarifier(
                    &source,
                    &candidates,
                    &question,
                    ClarifyReason::OutOfRange,
                ))
            }
            Arbitration::WhichSource {
                chat,
                widget,
                position,
            } => {
                let question = format!(
                    "Did you mean option {position} from the chat options or from {}?",
                    source_name(&widget)
                );
                let reply = format!(
                    "{question}\nChat options: {}",
                    join_labels(&labels(&chat), "and")
                );
                TierOutcome::Handled(
                    Decision::clarify(ClarifyReason::WhichSource, reply).with_effect(
                        SessionEffect::EnterClarification {
                            question,
                            pending_position: Some(position),
                        },
                    ),
                )
            }
            Arbitration::Stale(target) => TierOutcome::Handled(stale(&target)),
        }
    }

    fn resume(
        &self,
        cx: &TierContext<'_>,
        consultation: Consultation,
        reply: Result<BridgeReply, BridgeError>,
    ) -> TierOutcome {
        let Some(source) = consultation.source else {
            return TierOutcome::PassThrough;
        };
        let candidates = consultation.candidates;

        let question = match &reply {
            Ok(reply) => {
                if let Some((_, candidate)) = ladder::validate_choice(reply, &candidates) {
                    return TierOutcome::Handled(select(&source, candidate, cx));
                }
                match reply {
                    BridgeReply::NeedMoreInfo {
                        question: Some(question),
                    } if !question.trim().is_empty() => question.clone(),
                    _ => WHICH_ONE.to_string(),
                }
            }
            Err(err) => {
                tracing::info!(
                    turn = %cx.turn,
                    error = %err,
                    "Selection bridge failed; showing clarifier"
                );
                WHICH_ONE.to_string()
            }
        };

        tracing::debug!(turn = %cx.turn, options = candidates.len(), "Re-showing bounded set");
        TierOutcome::Handled(ladder::grounded_clarifier(
            &source,
            &candidates,
            &question,
            ClarifyReason::Ambiguous,
        ))
    }
}
