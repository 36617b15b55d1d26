use waypoint_core::SessionEffect;
use waypoint_core::normalize::fold;
use waypoint_core::phrases::is_stop;

use crate::decision::Decision;
use crate::tier::{Tier, TierContext, TierOutcome};

/// Stop/cancel. Always first, and always an exit from selection state.
pub struct StopTier;

impl Tier for StopTier {
    fn name(&self) -> &'static str {
        "stop"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        if !is_stop(cx.input) {
            return TierOutcome::PassThrough;
        }

        let grace = cx.tuning.decay.pending_options_grace;
        let active = cx.state.clarification().is_some()
            || cx.state.live_chat_options(cx.now, grace).is_some()
            || cx.state.latch().is_some();
        let reply = if !active {
            "Okay."
        } else if fold(cx.input).starts_with("skip") {
            "Okay, skipped."
        } else {
            "Okay, cancelled."
        };

        TierOutcome::Handled(Decision::acknowledge(reply).with_effects([
            SessionEffect::ExitClarification,
            SessionEffect::ClearPendingOptions,
            SessionEffect::ReleaseLatch,
        ]))
    }
}
