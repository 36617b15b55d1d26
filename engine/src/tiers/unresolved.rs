use waypoint_core::{ExecutableContext, SessionEffect};
use waypoint_core::fuzzy::fuzzy_match_with_floor;
use waypoint_types::Candidate;
use waypoint_types::text::numbered_list;

use crate::decision::Decision;
use crate::tier::{Tier, TierContext, TierOutcome};

/// Terminal reply when nothing at all matched.
pub const NOT_UNDERSTOOD: &str =
    "I don't understand. Could you rephrase, or tell me which panel you want to open?";

const MAX_FALLBACKS: usize = 3;

/// Terminal tier. Always handles: a short list of weak matches when there are
/// any, otherwise a request to rephrase.
pub struct UnresolvedTier;

impl Tier for UnresolvedTier {
    fn name(&self) -> &'static str {
        "unresolved"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        let thresholds = &cx.tuning.thresholds;
        let candidates: Vec<Candidate> = fuzzy_match_with_floor(
            cx.input,
            cx.vocabulary,
            cx.state.rejected(),
            thresholds,
            thresholds.relaxed_floor,
        )
        .into_iter()
        .take(MAX_FALLBACKS)
        .filter_map(|m| cx.vocabulary.get(m.command_index))
        .map(|c| Candidate::new(c.id.clone(), c.label.clone(), c.action.clone()))
        .collect();

        if candidates.is_empty() {
            tracing::debug!(turn = %cx.turn, "Unresolved");
            return TierOutcome::Handled(Decision::unrecognized(NOT_UNDERSTOOD));
        }

        let labels: Vec<&str> = candidates.iter().map(|c| c.label.as_str()).collect();
        let reply = format!(
            "I'm not sure what you meant. Is it one of these?\n{}",
            numbered_list(&labels)
        );
        // A miss never displaces live options or a latch.
        let effect = match cx.state.executable() {
            ExecutableContext::None => SessionEffect::ShowOptions {
                candidates: candidates.clone(),
                source_message: None,
                letter_tagged: false,
            },
            ExecutableContext::ChatOptions(_) | ExecutableContext::FocusedWidget(_) => {
                SessionEffect::SetLastSuggestion {
                    candidates: candidates.clone(),
                    input: cx.input.to_string(),
                }
            }
        };
        TierOutcome::Handled(
            Decision::unrecognized(reply)
                .with_options(candidates)
                .with_effect(effect),
        )
    }
}
