use waypoint_core::SessionEffect;
use waypoint_core::command::is_explicit_command;
use waypoint_core::ordinal::is_ordinal;
use waypoint_core::phrases::looks_like_question;
use waypoint_core::scope::detect_scope_cue;

use crate::tier::{Tier, TierContext, TierOutcome};
use crate::tiers::context_qa::parse_query;

/// Command interrupts. Never resolves a turn: a genuine new command or a new
/// question only clears the selection state that would otherwise capture it,
/// and routing continues.
pub struct InterruptTier;

impl Tier for InterruptTier {
    fn name(&self) -> &'static str {
        "interrupt"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        // Scope cues outrank explicit commands.
        if detect_scope_cue(cx.input, cx.ui).is_some() {
            return TierOutcome::PassThrough;
        }

        let grace = cx.tuning.decay.pending_options_grace;
        let has_options = cx.state.live_chat_options(cx.now, grace).is_some();
        let has_latch = cx.state.latch().is_some();
        let clarifying = cx.state.clarification().is_some();

        if is_explicit_command(cx.input, cx.vocabulary) && parse_query(cx.input).is_none() {
            let mut effects = Vec::new();
            if clarifying {
                effects.push(SessionEffect::ExitClarification);
            }
            if has_options {
                effects.push(SessionEffect::ClearPendingOptions);
            }
            if has_latch {
                effects.push(SessionEffect::ReleaseLatch);
            }
            if !effects.is_empty() {
                tracing::debug!(turn = %cx.turn, "Explicit command interrupts selection state");
                return TierOutcome::Defer(effects);
            }
            return TierOutcome::PassThrough;
        }

        if clarifying && looks_like_question(cx.input) && !is_ordinal(cx.input, false) {
            tracing::debug!(turn = %cx.turn, "New question exits clarification");
            return TierOutcome::Defer(vec![SessionEffect::ExitClarification]);
        }

        TierOutcome::PassThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::testing::{Fixture, now, state_with_options};
    use waypoint_types::WidgetId;

    #[test]
    fn explicit_command_clears_latch_and_options() {
        let mut fixture = Fixture::default();
        fixture.state.apply(
            SessionEffect::EngageLatch {
                widget_id: WidgetId::new("w-d"),
                title: "Widget D".to_string(),
            },
            now(),
        );
        let TierOutcome::Defer(effects) = InterruptTier.evaluate(&fixture.cx("open panel e")) else {
            panic!("command must defer effects");
        };
        assert_eq!(effects, vec![SessionEffect::ReleaseLatch]);
    }

    #[test]
    fn question_exits_clarification() {
        let mut fixture = Fixture {
            state: state_with_options(&["D", "E"]),
            ..Fixture::default()
        };
        fixture.state.apply(
            SessionEffect::EnterClarification {
                question: "Which one?".to_string(),
                pending_position: None,
            },
            now(),
        );
        let TierOutcome::Defer(effects) = InterruptTier.evaluate(&fixture.cx("where am I?")) else {
            panic!("question must defer");
        };
        assert_eq!(effects, vec![SessionEffect::ExitClarification]);
    }

    #[test]
    fn selection_input_is_left_alone() {
        let fixture = Fixture {
            state: state_with_options(&["D", "E"]),
            ..Fixture::default()
        };
        assert!(matches!(
            InterruptTier.evaluate(&fixture.cx("the second one")),
            TierOutcome::PassThrough
        ));
    }
}
