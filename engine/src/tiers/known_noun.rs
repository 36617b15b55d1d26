use waypoint_core::normalize::normalize;
use waypoint_core::phrases::strip_rejection_prefix;

use crate::tier::{Tier, TierContext, TierOutcome};
use crate::tiers::command_decision;

/// Exact phrase hits against the merged vocabulary ("recent entries",
/// "open demo widget", "go home").
pub struct KnownNounTier;

impl Tier for KnownNounTier {
    fn name(&self) -> &'static str {
        "known_noun"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        let normalized = normalize(&strip_rejection_prefix(cx.input));
        if normalized.is_empty() {
            return TierOutcome::PassThrough;
        }
        cx.vocabulary
            .iter()
            .find(|command| command.matches_phrase(&normalized))
            .map_or(TierOutcome::PassThrough, |command| {
                tracing::debug!(turn = %cx.turn, command = %command.id, "Known phrase");
                TierOutcome::Handled(command_decision(command, cx.now))
            })
    }
}
