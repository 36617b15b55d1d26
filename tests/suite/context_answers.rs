//! Answers drawn from context, history and permission-scoped app data.

use std::sync::Arc;
use std::time::Duration;

use waypoint_engine::{
    AppRecord, Engine, InMemoryDataSource, RecordingExecutor, ReplyKind, RetrievalExecutor,
    STALE_REPLY, TurnInput, TurnOutcome,
};
use waypoint_types::{ConversationId, EntityType, NonEmptyString, Resolution, UserScope};

use crate::common::{Harness, panels, t0};

#[tokio::test]
async fn history_questions_read_the_right_list() {
    let harness = Harness::new();
    harness.say("open panel e").await;

    let done = harness.say("did you open panel e?").await;
    assert_eq!(done.reply, "Yes, I opened Panel E.");

    let asked = harness.say("did I ask you to open panel e?").await;
    assert_eq!(asked.reply, "Yes, you asked me to open Panel E.");

    let never = harness.say("did I ask you to open calendar?").await;
    assert_eq!(never.reply, "No, you didn't ask me to open calendar.");
}

#[tokio::test]
async fn history_answers_need_whole_word_matches() {
    let harness = Harness::new();
    harness.say("open demo widget").await;

    let letter = harness.say("did you open e?").await;
    assert_eq!(letter.reply, "No, I haven't done that for e.");

    let partial = harness.say("did I ask you to open dem?").await;
    assert_eq!(partial.reply, "No, you didn't ask me to open dem.");

    let whole = harness.say("did you open demo widget?").await;
    assert_eq!(whole.reply, "Yes, I opened Demo Widget.");
}

async fn turn(engine: &Engine, text: &str, user: &str) -> TurnOutcome {
    let input = TurnInput::new(
        ConversationId::new(format!("conv-{user}")),
        NonEmptyString::new(text).unwrap(),
        UserScope::new(user),
        t0(),
    )
    .with_panels(panels());
    engine.handle_turn(input).await
}

#[tokio::test]
async fn failed_action_is_requested_but_not_done() {
    let engine = Engine::builder()
        .executor(Arc::new(RecordingExecutor::failing(["open_panel"])))
        .build();

    let failed = turn(&engine, "open panel e", "user-1").await;
    assert_eq!(failed.error.as_deref(), Some("Couldn't open Panel E."));

    let asked = turn(&engine, "did I ask you to open panel e?", "user-1").await;
    assert_eq!(asked.reply, "Yes, you asked me to open Panel E.");

    let done = turn(&engine, "did you open panel e?", "user-1").await;
    assert_eq!(done.reply, "No, I haven't done that for panel e.");
}

#[tokio::test]
async fn last_opened_panel_comes_from_the_transcript() {
    let harness = Harness::new();
    harness.say("open panel e").await;

    let outcome = harness.say("what did you just open?").await;
    assert_eq!(outcome.reply, "I last opened Panel E.");
    assert!(matches!(outcome.resolution, Some(Resolution::AnswerFromContext { .. })));
}

#[tokio::test]
async fn decayed_options_are_not_answered_from() {
    let mut harness = Harness::new();
    harness.show_options(&["D", "E"]).await;
    harness.advance(Duration::from_secs(90));

    let outcome = harness.say("is F in the list?").await;
    assert_eq!(outcome.kind, ReplyKind::ContextStale);
    assert_eq!(outcome.reply, STALE_REPLY);
}

fn record(owner: &str, name: &str, location: Option<&str>) -> AppRecord {
    AppRecord {
        id: format!("{owner}/{name}"),
        owner: owner.to_string(),
        entity_type: EntityType::Widget,
        name: name.to_string(),
        location: location.map(str::to_string),
    }
}

fn retrieval_engine() -> Engine {
    let data = InMemoryDataSource::new([
        record("user-1", "Budget Tracker", Some("Finance")),
        record("user-2", "Payroll", None),
    ]);
    Engine::builder()
        .executor(Arc::new(RetrievalExecutor::new(
            Arc::new(RecordingExecutor::new()),
            Arc::new(data),
        )))
        .build()
}

#[tokio::test]
async fn existence_query_is_answered_from_app_data() {
    let engine = retrieval_engine();

    let outcome = turn(&engine, "do I have a widget called budget tracker?", "user-1").await;
    assert!(matches!(
        outcome.resolution,
        Some(Resolution::RetrieveFromApp { entity_type: EntityType::Widget, .. })
    ));
    assert_eq!(outcome.reply, "Yes, you have a widget called Budget Tracker in Finance.");
}

#[tokio::test]
async fn existence_query_never_sees_other_users_data() {
    let engine = retrieval_engine();

    let outcome = turn(&engine, "do I have a widget called payroll?", "user-1").await;
    assert_eq!(outcome.reply, "No, I couldn't find a widget called \"payroll\".");

    let owner = turn(&engine, "do I have a widget called payroll?", "user-2").await;
    assert_eq!(owner.reply, "Yes, you have a widget called Payroll.");
}
