use waypoint_core::SessionEffect;
use waypoint_core::phrases::is_resume;
use waypoint_types::candidate::labels;
use waypoint_types::text::numbered_list;

use crate::decision::Decision;
use crate::tier::{Tier, TierContext, TierOutcome};

/// "Back to options": bring the last shown chat options back as the live
/// executable context.
pub struct ResumeTier;

impl Tier for ResumeTier {
    fn name(&self) -> &'static str {
        "resume"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        if !is_resume(cx.input) {
            return TierOutcome::PassThrough;
        }

        let retention = cx.tuning.decay.last_options_retention;
        let Some(options) = cx.state.last_options(cx.now, retention) else {
            return TierOutcome::Handled(Decision::stale());
        };

        let reply = format!(
            "Here are the options again:\n{}",
            numbered_list(&labels(&options.candidates))
        );
        TierOutcome::Handled(
            Decision::options(reply, options.candidates.clone())
                .with_effect(SessionEffect::ReshowLastOptions),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::decision::ReplyKind;
    use crate::tiers::testing::{Fixture, now, state_with_options};
    use waypoint_types::WidgetId;

    #[test]
    fn resumes_after_latch_replaced_options() {
        let mut fixture = Fixture {
            state: state_with_options(&["D", "E"]),
            ..Fixture::default()
        };
        fixture.state.apply(
            SessionEffect::EngageLatch {
                widget_id: WidgetId::new("w-1"),
                title: "Widget".to_string(),
            },
            now(),
        );

        let TierOutcome::Handled(decision) = ResumeTier.evaluate(&fixture.cx("back to options"))
        else {
            panic!("resume must be handled");
        };
        assert_eq!(decision.kind, ReplyKind::Options);
        assert_eq!(decision.options.len(), 2);
        assert_eq!(decision.effects, vec![SessionEffect::ReshowLastOptions]);
    }

    #[test]
    fn expired_options_are_stale() {
        let mut fixture = Fixture {
            state: state_with_options(&["D", "E"]),
            ..Fixture::default()
        };
        fixture.tuning.decay.last_options_retention = Duration::ZERO;
        let mut cx = fixture.cx("go back");
        let later = now() + Duration::from_secs(1);
        cx.now = later;

        let TierOutcome::Handled(decision) = ResumeTier.evaluate(&cx) else {
            panic!("resume must be handled");
        };
        assert_eq!(decision.kind, ReplyKind::ContextStale);
    }
}
