//! The constrained bridge as the engine sees it: real HTTP through wiremock,
//! scripted replies for the need-context loop and timeouts.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use waypoint_config::{BridgeSettings, Tuning};
use waypoint_engine::{RESHOW_REPLY, ReplyKind};
use waypoint_providers::claude::ClaudeBridge;
use waypoint_providers::scripted::{Scripted, ScriptedBridge};
use waypoint_providers::{BridgeReply, BridgeTask};
use waypoint_types::{GeneralTopic, Resolution};

use crate::common::{Harness, mount_claude_reply};

fn claude_tuning(server: &MockServer) -> Tuning {
    Tuning {
        bridge: BridgeSettings {
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
            timeout: Duration::from_secs(2),
            ..BridgeSettings::default()
        },
        ..Tuning::default()
    }
}

fn claude_harness(server: &MockServer) -> Harness {
    let tuning = claude_tuning(server);
    let bridge = ClaudeBridge::new(&tuning.bridge).unwrap();
    Harness::with_bridge(Arc::new(bridge), tuning)
}

#[tokio::test]
async fn claude_general_answer_reaches_the_user() {
    let server = MockServer::start().await;
    mount_claude_reply(
        &server,
        r#"{"intent":"general_answer","args":{"topic":"knowledge","answer":"Paris is the capital of France."}}"#,
    )
    .await;
    let harness = claude_harness(&server);

    let outcome = harness.say("what's the capital of france?").await;
    assert_eq!(outcome.tier, "general");
    assert_eq!(outcome.reply, "Paris is the capital of France.");
    assert!(matches!(
        outcome.resolution,
        Some(Resolution::GeneralAnswer { topic: GeneralTopic::Knowledge, .. })
    ));
}

#[tokio::test]
async fn claude_prose_reply_falls_through_to_unresolved() {
    let server = MockServer::start().await;
    mount_claude_reply(&server, "I think you might mean the capital city.").await;
    let harness = claude_harness(&server);

    let outcome = harness.say("what's the capital of france?").await;
    assert_eq!(outcome.kind, ReplyKind::Unrecognized);
    assert!(outcome.resolution.is_none());
}

#[tokio::test]
async fn claude_http_error_degrades_gracefully() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;
    let harness = claude_harness(&server);

    let outcome = harness.say("what's the capital of france?").await;
    assert_eq!(outcome.kind, ReplyKind::Unrecognized);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn known_commands_never_touch_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let harness = claude_harness(&server);

    let outcome = harness.say("open panel e").await;
    assert_eq!(outcome.reply, "Opening Panel E.");
}

#[tokio::test]
async fn need_context_retries_once_with_wider_window() {
    let harness = Harness::scripted([
        Scripted::Reply(BridgeReply::NeedContext),
        Scripted::Reply(BridgeReply::GeneralAnswer {
            topic: GeneralTopic::Knowledge,
            answer: "That was the budget report.".to_string(),
        }),
    ]);

    let outcome = harness.say("what was that report we talked about?").await;
    assert_eq!(outcome.reply, "That was the budget report.");

    let requests = harness.bridge.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.task == BridgeTask::Classify));
    assert!(!requests[0].extended_context);
    assert!(requests[1].extended_context);
}

#[tokio::test]
async fn second_need_context_reshows_instead_of_looping() {
    let harness = Harness::scripted([
        Scripted::Reply(BridgeReply::NeedContext),
        Scripted::Reply(BridgeReply::NeedContext),
        Scripted::Reply(BridgeReply::NeedContext),
    ]);

    let outcome = harness.say("what was that report we talked about?").await;
    assert_eq!(outcome.kind, ReplyKind::ContextStale);
    assert_eq!(outcome.reply, RESHOW_REPLY);
    assert_eq!(harness.bridge.call_count(), 2);
}

#[tokio::test]
async fn hung_bridge_times_out_into_fallback() {
    let bridge = ScriptedBridge::new([Scripted::Hang]);
    let tuning = Tuning {
        bridge: BridgeSettings {
            timeout: Duration::from_millis(50),
            ..BridgeSettings::default()
        },
        ..Tuning::default()
    };
    let harness = Harness::with_bridge(Arc::new(bridge.clone()), tuning);

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        harness.say("what's the capital of france?"),
    )
    .await
    .expect("turn must finish after the bridge timeout");
    assert_eq!(outcome.kind, ReplyKind::Unrecognized);
    assert_eq!(bridge.call_count(), 1);
}

#[tokio::test]
async fn follow_up_question_opens_clarification() {
    let harness = Harness::scripted([Scripted::Reply(BridgeReply::NeedMoreInfo {
        question: Some("Which city do you mean?".to_string()),
    })]);

    let outcome = harness.say("what's the weather like there?").await;
    assert_eq!(outcome.reply, "Which city do you mean?");
    assert!(harness.state().await.clarification().is_some());

    let skipped = harness.say("never mind").await;
    assert_eq!(skipped.reply, "Okay, cancelled.");
    assert!(harness.state().await.clarification().is_none());
}
