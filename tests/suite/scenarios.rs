//! Conversation scenarios: options, suggestions, clarification exits.

use waypoint_context::UiSnapshot;
use waypoint_engine::{ClarifyReason, GENERIC_FALLBACK, REJECTION_REPLY, ReplyKind, STALE_REPLY};
use waypoint_types::Resolution;

use crate::common::{Harness, widget_d};

#[tokio::test]
async fn membership_question_lists_what_was_shown() {
    let harness = Harness::new();
    harness.show_options(&["D", "E"]).await;

    let outcome = harness.say("is F in the list?").await;
    assert_eq!(outcome.reply, "No, only D and E.");
    assert_eq!(outcome.kind, ReplyKind::Answer);
    assert_eq!(outcome.tier, "context_qa");

    let yes = harness.say("is E in the list?").await;
    assert_eq!(yes.reply, "Yes, E is option 2.");
    assert_eq!(harness.bridge.call_count(), 0);
}

#[tokio::test]
async fn rejecting_a_suggestion_then_repeating_the_typo() {
    let harness = Harness::new();

    let suggested = harness.say("dmo wiget").await;
    assert_eq!(suggested.reply, "Did you mean Demo Widget?");
    assert_eq!(suggested.kind, ReplyKind::Clarify(ClarifyReason::Suggestion));

    let rejected = harness.say("no").await;
    assert_eq!(rejected.reply, "Okay — what would you like instead?");
    assert_eq!(rejected.reply, REJECTION_REPLY);
    assert!(rejected.resolution.is_none());

    let repeated = harness.say("dmo wiget").await;
    assert_eq!(repeated.reply, GENERIC_FALLBACK);
    assert_eq!(repeated.kind, ReplyKind::Unrecognized);
}

#[tokio::test]
async fn affirming_a_suggestion_executes_it() {
    let harness = Harness::new();
    harness.say("dmo wiget").await;

    let outcome = harness.say("yes").await;
    assert_eq!(outcome.reply, "Opening Demo Widget.");
    assert_eq!(harness.executor.executed().len(), 1);
}

#[tokio::test]
async fn no_followed_by_command_rejects_and_routes() {
    let harness = Harness::new();
    harness.say("dmo wiget").await;

    let outcome = harness.say("no, open panel e").await;
    assert_eq!(outcome.reply, "Opening Panel E.");
}

/// Chat options plus a focused (not latched) widget, then an ordinal that
/// fits both.
async fn which_source(harness: &mut Harness) {
    harness.ui = UiSnapshot::default().with_widget(widget_d()).with_focus("w-d");
    harness.show_options(&["Panel D", "Panel E"]).await;

    let outcome = harness.say("2").await;
    assert_eq!(outcome.kind, ReplyKind::Clarify(ClarifyReason::WhichSource));
    assert!(
        outcome
            .reply
            .starts_with("Did you mean option 2 from the chat options or from Widget D?")
    );
    assert!(harness.state().await.clarification().is_some());
}

#[tokio::test]
async fn skip_exits_clarification() {
    let mut harness = Harness::new();
    which_source(&mut harness).await;

    let outcome = harness.say("skip").await;
    assert_eq!(outcome.kind, ReplyKind::Acknowledged);
    assert_eq!(outcome.reply, "Okay, skipped.");
    assert!(outcome.resolution.is_none());
    assert!(harness.state().await.clarification().is_none());
}

#[tokio::test]
async fn new_question_exits_clarification_without_looping() {
    let mut harness = Harness::new();
    which_source(&mut harness).await;

    let outcome = harness.say("where am I?").await;
    assert_eq!(outcome.tier, "context_qa");
    assert!(outcome.reply.starts_with("You're on the "), "{}", outcome.reply);
    assert!(!outcome.reply.contains("Did you mean option"));
    assert!(harness.state().await.clarification().is_none());
}

#[tokio::test]
async fn clarification_answer_picks_the_source() {
    let mut harness = Harness::new();
    which_source(&mut harness).await;

    let outcome = harness.say("from chat").await;
    assert!(matches!(
        outcome.resolution,
        Some(Resolution::OpenPanel { ref title, .. }) if title == "Panel E"
    ));
}

#[tokio::test]
async fn back_to_options_after_stop() {
    let harness = Harness::new();
    harness.show_options(&["Panel D", "Panel E"]).await;

    let stopped = harness.say("stop").await;
    assert_eq!(stopped.reply, "Okay, cancelled.");

    let resumed = harness.say("back to options").await;
    assert_eq!(resumed.kind, ReplyKind::Options);
    assert_eq!(resumed.options.len(), 2);

    let picked = harness.say("the first one").await;
    assert_eq!(picked.reply, "Opening Panel D.");
}

#[tokio::test]
async fn decayed_options_are_reported_stale() {
    let mut harness = Harness::new();
    harness.show_options(&["D", "E"]).await;
    harness.advance(std::time::Duration::from_secs(60 * 60 * 24));

    let outcome = harness.say("back to options").await;
    assert_eq!(outcome.kind, ReplyKind::ContextStale);
    assert_eq!(outcome.reply, STALE_REPLY);
}

#[tokio::test]
async fn unrelated_miss_keeps_shown_options() {
    let harness = Harness::new();
    harness.show_options(&["D", "E"]).await;

    let miss = harness.say("no").await;
    assert_eq!(miss.tier, "unresolved");

    let state = harness.state().await;
    let grace = waypoint_config::Tuning::default().decay.pending_options_grace;
    let live = state
        .live_chat_options(harness.now, grace)
        .expect("options survive the miss");
    let labels: Vec<&str> = live.candidates.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, ["D", "E"]);

    let picked = harness.say("the second one").await;
    assert_eq!(picked.reply, "Opening E.");
}
