use waypoint_core::SessionEffect;
use waypoint_core::command::is_explicit_command;
use waypoint_core::phrases::{Rejection, detect_rejection, is_affirmation};
use waypoint_types::candidate::labels;
use waypoint_types::text::numbered_list;
use waypoint_types::{HistoryEntry, Resolution};

use crate::decision::Decision;
use crate::tier::{Tier, TierContext, TierOutcome};
use crate::tiers::{action_reply, history_kind};

/// Reply to a rejected "did you mean".
pub const REJECTION_REPLY: &str = "Okay — what would you like instead?";

/// Rejects or accepts the last "did you mean" suggestion.
pub struct SuggestionTier;

impl Tier for SuggestionTier {
    fn name(&self) -> &'static str {
        "suggestion"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        let Some(suggestion) = cx.state.last_suggestion() else {
            return TierOutcome::PassThrough;
        };

        match detect_rejection(cx.input) {
            Rejection::Exact => return TierOutcome::Handled(rejected()),
            Rejection::Prefixed { remainder } => {
                // "no, open panel e": reject and let the command route.
                if is_explicit_command(&remainder, cx.vocabulary) {
                    return TierOutcome::Defer(vec![SessionEffect::RejectLastSuggestion]);
                }
                return TierOutcome::Handled(rejected());
            }
            Rejection::None => {}
        }

        if !is_affirmation(cx.input) {
            return TierOutcome::PassThrough;
        }

        match suggestion.candidates.as_slice() {
            [] => TierOutcome::PassThrough,
            [only] => {
                let action = only.action.clone();
                let entry = HistoryEntry::for_action(history_kind(&action), &action, cx.now);
                TierOutcome::Handled(
                    Decision::action(Resolution::from(action.clone()), action_reply(&action))
                        .with_effects([
                            SessionEffect::RecordRequest(entry),
                            SessionEffect::ClearPendingOptions,
                            SessionEffect::ReleaseLatch,
                            SessionEffect::ExitClarification,
                        ]),
                )
            }
            many => {
                let reply = format!("Which one?\n{}", numbered_list(&labels(many)));
                TierOutcome::Handled(Decision::options(reply, many.to_vec()).with_effect(
                    SessionEffect::ShowOptions {
                        candidates: many.to_vec(),
                        source_message: suggestion.message,
                        letter_tagged: false,
                    },
                ))
            }
        }
    }
}

fn rejected() -> Decision {
    Decision::acknowledge(REJECTION_REPLY).with_effect(SessionEffect::RejectLastSuggestion)
}
