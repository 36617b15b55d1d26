//! The engine entry point: one serialized pass per user turn.
//!
//! ```text
//! handle_turn
//!   ├── stop phrase? bump epoch (before waiting)
//!   ├── take the conversation's turn lock
//!   ├── load state ─ restore ephemeral ─ reconcile against live UI
//!   ├── build vocabulary, load chat window
//!   ├── route ─────────────── cancelled? return, nothing saved
//!   ├── commit effects ─ execute resolution ─ record action
//!   └── save state, keep ephemeral in memory
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use serde::Serialize;
use tokio::sync::{Mutex as TurnLock, watch};

use waypoint_config::Tuning;
use waypoint_context::{
    ContextSource, InMemoryTranscript, UiSnapshot, build_ui_context, load_chat_context,
};
use waypoint_core::phrases::is_stop;
use waypoint_core::{EphemeralState, SessionEffect, SessionState, build, core_commands};
use waypoint_providers::LlmBridge;
use waypoint_providers::offline::OfflineBridge;
use waypoint_types::{
    Candidate, ChatMessage, ConversationId, HistoryEntry, HistoryKind, MessageId, NonEmptyString,
    PanelManifest, Resolution, TurnId, UserScope, VisiblePanel, WidgetId,
};

use crate::decision::{Decision, ReplyKind};
use crate::executor::{ActionExecutor, ExecutionReport, RecordingExecutor};
use crate::router::{CancelGuard, Cancelled, RouteRequest, Router};
use crate::store::{InMemorySessionStore, SessionStore};
use crate::tiers::history_kind;

/// Reply when the executor fails without saying why.
pub const EXECUTION_FAILED: &str = "Sorry, I couldn't do that.";

// ============================================================================
// Turn input / output
// ============================================================================

#[derive(Debug, Clone)]
pub struct TurnInput {
    pub conversation: ConversationId,
    pub text: NonEmptyString,
    pub ui: UiSnapshot,
    pub visible_panels: Vec<VisiblePanel>,
    pub manifests: Vec<PanelManifest>,
    pub user: UserScope,
    pub now: SystemTime,
}

impl TurnInput {
    #[must_use]
    pub fn new(
        conversation: ConversationId,
        text: NonEmptyString,
        user: UserScope,
        now: SystemTime,
    ) -> Self {
        Self {
            conversation,
            text,
            ui: UiSnapshot::default(),
            visible_panels: Vec::new(),
            manifests: Vec::new(),
            user,
            now,
        }
    }

    #[must_use]
    pub fn with_ui(mut self, ui: UiSnapshot) -> Self {
        self.ui = ui;
        self
    }

    #[must_use]
    pub fn with_panels(mut self, panels: Vec<VisiblePanel>) -> Self {
        self.visible_panels = panels;
        self
    }

    #[must_use]
    pub fn with_manifests(mut self, manifests: Vec<PanelManifest>) -> Self {
        self.manifests = manifests;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub turn: TurnId,
    pub reply: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    pub kind: ReplyKind,
    pub tier: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnOutcome {
    fn cancelled(turn: TurnId) -> Self {
        Self {
            turn,
            reply: String::new(),
            options: Vec::new(),
            resolution: None,
            kind: ReplyKind::Cancelled,
            tier: "cancelled",
            execution: None,
            error: None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.kind == ReplyKind::Cancelled
    }

    /// The assistant message a host appends to its transcript for this turn.
    #[must_use]
    pub fn to_assistant_message(&self, id: MessageId, now: SystemTime) -> ChatMessage {
        let mut message = ChatMessage::assistant(id.value(), self.reply.clone(), now);
        if !self.options.is_empty() {
            message = message.with_options(self.options.clone());
        }
        let executed = self.execution.as_ref().is_some_and(|r| r.success);
        if executed && let Some(Resolution::OpenPanel { panel_id, title }) = &self.resolution {
            message = message.with_opened_panel(panel_id.as_str(), title.clone());
        }
        if let Some(error) = &self.error {
            message = message.with_error(error.clone());
        }
        message
    }
}

// ============================================================================
// Per-conversation slots
// ============================================================================

#[derive(Debug)]
struct SlotState {
    next_turn: TurnId,
    ephemeral: EphemeralState,
}

/// Slot count above which idle slots are dropped. A dropped conversation
/// keeps its persisted state; only its turn numbering restarts.
const IDLE_SLOT_LIMIT: usize = 1024;

#[derive(Debug)]
struct Slot {
    turn: TurnLock<SlotState>,
    epoch: watch::Sender<u64>,
}

impl Slot {
    fn new() -> Self {
        let (epoch, _) = watch::channel(0);
        Self {
            turn: TurnLock::new(SlotState {
                next_turn: TurnId::new(1),
                ephemeral: EphemeralState::default(),
            }),
            epoch,
        }
    }

    /// No turn holds or awaits the slot and it carries no suggestion state.
    fn is_idle(slot: &Arc<Self>) -> bool {
        Arc::strong_count(slot) == 1
            && slot.turn.try_lock().is_ok_and(|state| {
                state.ephemeral.last_suggestion.is_none() && state.ephemeral.rejected.is_empty()
            })
    }
}

fn prune_idle_slots(slots: &mut HashMap<ConversationId, Arc<Slot>>, limit: usize) {
    if slots.len() < limit {
        return;
    }
    let before = slots.len();
    slots.retain(|_, slot| !Slot::is_idle(slot));
    tracing::debug!(dropped = before - slots.len(), "Pruned idle conversation slots");
}

// ============================================================================
// Engine
// ============================================================================

pub struct Engine {
    router: Router,
    source: Arc<dyn ContextSource>,
    executor: Arc<dyn ActionExecutor>,
    store: Arc<dyn SessionStore>,
    tuning: Tuning,
    slots: Mutex<HashMap<ConversationId, Arc<Slot>>>,
    slot_limit: usize,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("router", &self.router)
            .field("tuning", &self.tuning)
            .finish_non_exhaustive()
    }
}

impl Engine {
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    #[must_use]
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    fn slot(&self, conversation: &ConversationId) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if !slots.contains_key(conversation) {
            prune_idle_slots(&mut slots, self.slot_limit);
        }
        Arc::clone(
            slots
                .entry(conversation.clone())
                .or_insert_with(|| Arc::new(Slot::new())),
        )
    }

    async fn load_state(&self, conversation: &ConversationId) -> SessionState {
        let limit = self.tuning.history_limit;
        let mut state = match self.store.load(conversation).await {
            Ok(Some(state)) if state.is_compatible() => state,
            Ok(Some(state)) => {
                tracing::warn!(
                    conversation = %conversation,
                    version = state.version,
                    "Stored session state has an incompatible version; starting fresh"
                );
                SessionState::new(limit)
            }
            Ok(None) => SessionState::new(limit),
            Err(err) => {
                tracing::warn!(
                    conversation = %conversation,
                    error = %err,
                    "Session state unreadable; starting fresh"
                );
                SessionState::new(limit)
            }
        };
        state.set_history_limit(limit);
        state
    }

    async fn save_state(&self, conversation: &ConversationId, state: &SessionState) {
        if let Err(err) = self.store.save(conversation, state).await {
            tracing::warn!(
                conversation = %conversation,
                error = %err,
                "Failed to save session state"
            );
        }
    }

    /// Resolve one user turn.
    ///
    /// Turns of the same conversation run one at a time. A stop phrase
    /// cancels whatever turn is in flight before queueing behind it; the
    /// cancelled turn returns [`ReplyKind::Cancelled`] and leaves no trace.
    pub async fn handle_turn(&self, input: TurnInput) -> TurnOutcome {
        let conversation = &input.conversation;
        let slot = self.slot(conversation);

        if is_stop(&input.text) {
            slot.epoch.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
            tracing::debug!(conversation = %conversation, "Stop phrase bumped epoch");
        }
        let mut cancel = CancelGuard::new(slot.epoch.subscribe());

        let mut slot_state = slot.turn.lock().await;
        let turn = slot_state.next_turn;
        slot_state.next_turn = turn.next();
        if cancel.is_cancelled() {
            tracing::debug!(
                conversation = %conversation,
                turn = %turn,
                "Turn superseded while queued"
            );
            return TurnOutcome::cancelled(turn);
        }

        let mut state = self.load_state(conversation).await;
        state.restore_ephemeral(slot_state.ephemeral.clone());

        let ui = build_ui_context(&input.ui);
        let reconciled = state.reconcile(&ui, &self.tuning, input.now);
        if reconciled != Default::default() {
            tracing::debug!(turn = %turn, ?reconciled, "Reconciled session state");
        }

        let vocabulary = build(&core_commands(), &input.visible_panels, &input.manifests);
        let chat = tokio::select! {
            biased;
            () = cancel.cancelled() => return TurnOutcome::cancelled(turn),
            chat = load_chat_context(
                self.source.as_ref(),
                conversation,
                self.tuning.window_messages,
                input.now,
                &self.tuning.decay,
            ) => chat,
        };

        let request = RouteRequest {
            conversation,
            input: input.text.as_str(),
            chat,
            ui: &ui,
            vocabulary: &vocabulary,
            tuning: &self.tuning,
            user: &input.user,
            turn,
            now: input.now,
        };
        let routed = match self.router.route(request, &state, &mut cancel).await {
            Ok(routed) => routed,
            Err(Cancelled) => {
                tracing::info!(
                    conversation = %conversation,
                    turn = %turn,
                    "Turn cancelled; discarding"
                );
                return TurnOutcome::cancelled(turn);
            }
        };

        state.apply_all(routed.effects, input.now);
        let mut outcome = self
            .execute(turn, routed.tier, routed.decision, &mut state, input.now)
            .await;
        if routed.bridge_calls > 0 {
            tracing::debug!(
                turn = %turn,
                calls = routed.bridge_calls,
                extended = routed.extended,
                "Bridge used"
            );
        }

        self.save_state(conversation, &state).await;
        slot_state.ephemeral = state.take_ephemeral();

        if outcome.reply.is_empty() {
            outcome.reply = EXECUTION_FAILED.to_string();
        }
        outcome
    }

    async fn execute(
        &self,
        turn: TurnId,
        tier: &'static str,
        decision: Decision,
        state: &mut SessionState,
        now: SystemTime,
    ) -> TurnOutcome {
        let Decision {
            resolution,
            reply,
            options,
            kind,
            ..
        } = decision;
        let mut outcome = TurnOutcome {
            turn,
            reply,
            options,
            resolution,
            kind,
            tier,
            execution: None,
            error: None,
        };
        let Some(resolution) = outcome.resolution.as_ref() else {
            return outcome;
        };

        let report = self.executor.execute(resolution).await;
        if report.success {
            if let Some(action) = resolution.as_action() {
                let entry = HistoryEntry::for_action(history_kind(&action), &action, now);
                state.apply(SessionEffect::RecordAction(entry), now);
                state.apply(SessionEffect::ClearSuggestions, now);
            } else if let Resolution::RetrieveFromApp { .. } = resolution
                && let Some(entry) = state
                    .request_history()
                    .latest()
                    .filter(|e| e.kind == HistoryKind::Lookup)
            {
                let entry = entry.clone();
                state.apply(SessionEffect::RecordAction(entry), now);
            }
            if let Some(message) = &report.message {
                outcome.reply.clone_from(message);
            }
        } else {
            let message = report.message.clone().unwrap_or_else(|| EXECUTION_FAILED.to_string());
            tracing::warn!(
                turn = %turn,
                tag = resolution.tag(),
                error = %message,
                "Execution failed"
            );
            outcome.reply.clone_from(&message);
            outcome.error = Some(message);
        }
        outcome.execution = Some(report);
        outcome
    }

    /// Host-initiated focus on a widget: engages the latch directly.
    pub async fn focus_widget(
        &self,
        conversation: &ConversationId,
        widget_id: WidgetId,
        title: impl Into<String>,
        now: SystemTime,
    ) {
        self.apply_host_effect(
            conversation,
            SessionEffect::EngageLatch {
                widget_id,
                title: title.into(),
            },
            now,
        )
        .await;
    }

    pub async fn release_focus(&self, conversation: &ConversationId, now: SystemTime) {
        self.apply_host_effect(conversation, SessionEffect::ReleaseLatch, now).await;
    }

    /// Options the host showed on its own; they become the live chat options.
    pub async fn register_options(
        &self,
        conversation: &ConversationId,
        candidates: Vec<Candidate>,
        source_message: Option<MessageId>,
        now: SystemTime,
    ) {
        self.apply_host_effect(
            conversation,
            SessionEffect::ShowOptions {
                candidates,
                source_message,
                letter_tagged: false,
            },
            now,
        )
        .await;
    }

    async fn apply_host_effect(
        &self,
        conversation: &ConversationId,
        effect: SessionEffect,
        now: SystemTime,
    ) {
        let slot = self.slot(conversation);
        let mut slot_state = slot.turn.lock().await;
        let mut state = self.load_state(conversation).await;
        state.restore_ephemeral(slot_state.ephemeral.clone());
        tracing::debug!(conversation = %conversation, ?effect, "Host effect");
        state.apply(effect, now);
        self.save_state(conversation, &state).await;
        slot_state.ephemeral = state.take_ephemeral();
    }

    /// Current persisted state plus in-memory suggestion bookkeeping.
    pub async fn snapshot(&self, conversation: &ConversationId) -> SessionState {
        let slot = self.slot(conversation);
        let slot_state = slot.turn.lock().await;
        let mut state = self.load_state(conversation).await;
        state.restore_ephemeral(slot_state.ephemeral.clone());
        state
    }
}

// ============================================================================
// Builder
// ============================================================================

pub struct EngineBuilder {
    bridge: Arc<dyn LlmBridge>,
    source: Arc<dyn ContextSource>,
    executor: Arc<dyn ActionExecutor>,
    store: Arc<dyn SessionStore>,
    tuning: Tuning,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            bridge: Arc::new(OfflineBridge),
            source: Arc::new(InMemoryTranscript::new()),
            executor: Arc::new(RecordingExecutor::new()),
            store: Arc::new(InMemorySessionStore::new()),
            tuning: Tuning::default(),
        }
    }
}

impl EngineBuilder {
    #[must_use]
    pub fn bridge(mut self, bridge: Arc<dyn LlmBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    #[must_use]
    pub fn source(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = executor;
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    #[must_use]
    pub fn build(self) -> Engine {
        Engine {
            router: Router::new(self.bridge, Arc::clone(&self.source)),
            source: self.source,
            executor: self.executor,
            store: self.store,
            tuning: self.tuning,
            slots: Mutex::new(HashMap::new()),
            slot_limit: IDLE_SLOT_LIMIT,
        }
    }
}
