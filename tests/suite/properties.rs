//! Invariants and routing laws, checked end to end through `Engine`.

use waypoint_config::Tuning;
use waypoint_core::{SessionState, build, core_commands, fuzzy_match};
use waypoint_engine::{GENERIC_FALLBACK, ReplyKind};
use waypoint_types::Resolution;

use crate::common::{Harness, panels, widget_d};

fn live_contexts(state: &SessionState, harness: &Harness) -> usize {
    let grace = Tuning::default().decay.pending_options_grace;
    usize::from(state.latch().is_some())
        + usize::from(state.live_chat_options(harness.now, grace).is_some())
}

#[tokio::test]
async fn at_most_one_executable_context_after_every_turn() {
    let mut harness = Harness::new();

    harness.show_options(&["Panel D", "Panel E"]).await;
    assert_eq!(live_contexts(&harness.state().await, &harness), 1);

    // Focusing a widget replaces the chat options.
    harness.focus(widget_d()).await;
    let state = harness.state().await;
    assert!(state.latch().is_some());
    assert_eq!(live_contexts(&state, &harness), 1);

    for input in [
        "second",
        "back to options",
        "the first one",
        "go home",
        "what were the options?",
    ] {
        harness.say(input).await;
        assert!(
            live_contexts(&harness.state().await, &harness) <= 1,
            "more than one live context after {input:?}"
        );
    }
}

#[tokio::test]
async fn rejected_label_stays_out_of_suggestions_until_navigation() {
    let harness = Harness::new();

    let first = harness.say("dmo wiget").await;
    assert_eq!(first.reply, "Did you mean Demo Widget?");

    harness.say("no").await;
    let again = harness.say("dmo wiget").await;
    assert_eq!(again.reply, GENERIC_FALLBACK);
    assert!(!again.reply.contains("Demo Widget"));

    let other = harness.say("dmo widgt please").await;
    assert!(!other.reply.contains("Did you mean Demo Widget"));

    // A successful navigation clears the rejection set.
    let home = harness.say("go home").await;
    assert_eq!(home.kind, ReplyKind::Action);
    assert!(harness.state().await.rejected().is_empty());

    let fresh = harness.say("dmo wiget").await;
    assert_eq!(fresh.reply, "Did you mean Demo Widget?");
}

#[test]
fn vocabulary_build_is_idempotent() {
    let first = build(&core_commands(), &panels(), &[]);
    let second = build(&core_commands(), &panels(), &[]);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn unique_high_confidence_match_never_consults_bridge() {
    let harness = Harness::new();

    let outcome = harness.say("vuew demo widgets").await;
    assert_eq!(outcome.reply, "Opening Demo Widget.");
    assert_eq!(harness.bridge.call_count(), 0);

    harness.show_options(&["Panel D", "Panel E"]).await;
    let picked = harness.say("panel d").await;
    assert_eq!(picked.kind, ReplyKind::Action);
    assert_eq!(harness.bridge.call_count(), 0);
}

#[test]
fn typo_scores_high_against_view_phrase() {
    let vocabulary = build(&core_commands(), &panels(), &[]);
    let thresholds = Tuning::default().thresholds;
    let matches = fuzzy_match("vuew demo widgets", &vocabulary, &Default::default(), &thresholds);
    let best = matches.first().expect("a match");
    assert_eq!(best.label, "Demo Widget");
    assert!(best.score >= 0.90, "score was {}", best.score);
}

#[tokio::test]
async fn explicit_command_beats_latch() {
    let mut harness = Harness::new();
    harness.focus(widget_d()).await;

    let outcome = harness.say("open panel e").await;
    assert!(matches!(
        outcome.resolution,
        Some(Resolution::OpenPanel { ref panel_id, .. }) if panel_id.as_str() == "panel-e"
    ));
    assert_eq!(outcome.reply, "Opening Panel E.");
    assert!(harness.state().await.latch().is_none());
}

#[tokio::test]
async fn latch_resolves_unscoped_selection() {
    let mut harness = Harness::new();
    harness.focus(widget_d()).await;

    let outcome = harness.say("second").await;
    assert_eq!(outcome.reply, "Opening Beta Note.");
    assert_eq!(outcome.tier, "selection");
    assert!(harness.state().await.latch().is_some());
}
