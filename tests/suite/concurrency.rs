//! Turn serialization and stop-phrase cancellation.

use std::time::Duration;

use waypoint_engine::ReplyKind;
use waypoint_providers::scripted::Scripted;
use waypoint_types::{ConversationId, TurnId};

use crate::common::Harness;

async fn wait_for_bridge_call(harness: &Harness) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while harness.bridge.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("turn never reached the bridge");
}

#[tokio::test]
async fn stop_cancels_the_turn_in_flight() {
    let harness = Harness::scripted([Scripted::Hang]);
    harness.show_options(&["Panel D", "Panel E"]).await;

    let engine = harness.engine.clone();
    let input = harness.input("what's the capital of france?");
    let in_flight = tokio::spawn(async move { engine.handle_turn(input).await });
    wait_for_bridge_call(&harness).await;

    let stop = harness.engine.handle_turn(harness.input("stop")).await;
    let cancelled = in_flight.await.unwrap();

    assert!(cancelled.is_cancelled());
    assert_eq!(cancelled.kind, ReplyKind::Cancelled);
    assert!(cancelled.resolution.is_none());
    assert_eq!(stop.kind, ReplyKind::Acknowledged);
    assert_eq!(stop.reply, "Okay, cancelled.");

    let state = harness.state().await;
    assert!(state.request_history().is_empty());
    assert!(state.clarification().is_none());
}

#[tokio::test]
async fn turns_of_one_conversation_are_numbered_in_order() {
    let harness = Harness::new();
    let first = harness.say("go home").await;
    let second = harness.say("open panel e").await;
    assert_eq!(first.turn, TurnId::new(1));
    assert_eq!(second.turn, TurnId::new(2));
}

#[tokio::test]
async fn a_hung_conversation_does_not_block_another() {
    let mut harness = Harness::scripted([Scripted::Hang]);

    let engine = harness.engine.clone();
    let input = harness.input("what's the capital of france?");
    let hung = tokio::spawn(async move { engine.handle_turn(input).await });
    wait_for_bridge_call(&harness).await;

    harness.conversation = ConversationId::new("conv-2");
    let outcome = tokio::time::timeout(Duration::from_secs(1), harness.say("open panel e"))
        .await
        .expect("other conversation must not wait");
    assert_eq!(outcome.reply, "Opening Panel E.");

    hung.abort();
}
