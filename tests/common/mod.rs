//! Shared test utilities and fixtures
//!
//! A [`Harness`] drives one conversation through the public engine API, the
//! way a host would: user and assistant messages go into a shared transcript,
//! the bridge is scripted, and executed resolutions are recorded.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use waypoint_config::Tuning;
use waypoint_context::{InMemoryTranscript, UiSnapshot, WidgetSnapshot};
use waypoint_core::SessionState;
use waypoint_engine::{Engine, RecordingExecutor, TurnInput, TurnOutcome};
use waypoint_providers::scripted::{Scripted, ScriptedBridge};
use waypoint_providers::LlmBridge;
use waypoint_types::{
    Action, Candidate, ChatMessage, ConversationId, NonEmptyString, UserScope, VisiblePanel,
    WidgetId,
};

pub fn t0() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

pub fn option(label: &str) -> Candidate {
    let id = label.to_lowercase().replace(' ', "-");
    Candidate::new(id.clone(), label, Action::open_panel(format!("panel-{id}"), label))
}

pub fn panels() -> Vec<VisiblePanel> {
    vec![
        VisiblePanel::new("panel-d", "Panel D"),
        VisiblePanel::new("panel-e", "Panel E"),
        VisiblePanel::new("widget-demo", "Demo Widget"),
    ]
}

/// Widget D with three selectable notes.
pub fn widget_d() -> WidgetSnapshot {
    WidgetSnapshot::new("w-d", "Widget D", "list").with_items(vec![
        option("Alpha Note"),
        option("Beta Note"),
        option("Gamma Note"),
    ])
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub transcript: Arc<InMemoryTranscript>,
    pub bridge: ScriptedBridge,
    pub executor: Arc<RecordingExecutor>,
    pub conversation: ConversationId,
    pub ui: UiSnapshot,
    pub now: SystemTime,
}

impl Harness {
    pub fn new() -> Self {
        Self::scripted([])
    }

    pub fn scripted(steps: impl IntoIterator<Item = Scripted>) -> Self {
        let bridge = ScriptedBridge::new(steps);
        Self::build(bridge.clone(), Arc::new(bridge), Tuning::default())
    }

    pub fn with_bridge(bridge: Arc<dyn LlmBridge>, tuning: Tuning) -> Self {
        Self::build(ScriptedBridge::new([]), bridge, tuning)
    }

    fn build(script: ScriptedBridge, bridge: Arc<dyn LlmBridge>, tuning: Tuning) -> Self {
        let transcript = Arc::new(InMemoryTranscript::new());
        let executor = Arc::new(RecordingExecutor::new());
        let engine = Engine::builder()
            .bridge(bridge)
            .source(transcript.clone())
            .executor(executor.clone())
            .tuning(tuning)
            .build();
        Self {
            engine: Arc::new(engine),
            transcript,
            bridge: script,
            executor,
            conversation: ConversationId::new("conv-1"),
            ui: UiSnapshot::default(),
            now: t0(),
        }
    }

    pub fn input(&self, text: &str) -> TurnInput {
        TurnInput::new(
            self.conversation.clone(),
            NonEmptyString::new(text).expect("non-empty input"),
            UserScope::new("user-1"),
            self.now,
        )
        .with_ui(self.ui.clone())
        .with_panels(panels())
    }

    /// One full user turn, recorded in the transcript like a host would.
    pub async fn say(&self, text: &str) -> TurnOutcome {
        let id = self.transcript.next_message_id(&self.conversation);
        self.transcript
            .append(&self.conversation, ChatMessage::user(id.value(), text, self.now));

        let outcome = self.engine.handle_turn(self.input(text)).await;

        if !outcome.is_cancelled() {
            let id = self.transcript.next_message_id(&self.conversation);
            self.transcript
                .append(&self.conversation, outcome.to_assistant_message(id, self.now));
        }
        outcome
    }

    /// The host shows `labels` as chat options.
    pub async fn show_options(&self, labels: &[&str]) {
        let candidates: Vec<Candidate> = labels.iter().map(|l| option(l)).collect();
        let id = self.transcript.next_message_id(&self.conversation);
        self.transcript.append(
            &self.conversation,
            ChatMessage::assistant(id.value(), "Here are your options.", self.now)
                .with_options(candidates.clone()),
        );
        self.engine
            .register_options(&self.conversation, candidates, Some(id), self.now)
            .await;
    }

    pub async fn focus(&mut self, widget: WidgetSnapshot) {
        let (id, title) = (widget.id.clone(), widget.title.clone());
        self.ui = self.ui.clone().with_widget(widget).with_focus(id.as_str());
        self.engine
            .focus_widget(&self.conversation, WidgetId::new(id.as_str()), title, self.now)
            .await;
    }

    pub async fn state(&self) -> SessionState {
        self.engine.snapshot(&self.conversation).await
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

/// Claude Messages API body whose text block is `text`.
pub fn claude_text(text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn"
    })
}

/// Mount a Messages API reply carrying `text`.
pub async fn mount_claude_reply(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_text(text)))
        .mount(server)
        .await;
}
