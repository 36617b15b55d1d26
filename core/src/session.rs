//! Session State Store.
//!
//! Per-conversation state with pure read/mutate operations and no I/O. The
//! router computes a list of [`SessionEffect`]s for a turn and the engine
//! applies them once the turn is resolved.
//!
//! The single-active-context invariant is structural: [`ExecutableContext`]
//! is one enum, and registering a context replaces whatever was there.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::fuzzy::rejection_key;
use waypoint_config::Tuning;
use waypoint_types::{
    BoundedHistory, Candidate, HistoryEntry, MessageId, OptionSetId, UiContext, WidgetId,
};

/// Serialized-state schema version.
pub const SESSION_STATE_VERSION: u32 = 1;

fn elapsed(since: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(since).unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOptions {
    pub set_id: OptionSetId,
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_message: Option<MessageId>,
    pub created_at: SystemTime,
    #[serde(default)]
    pub letter_tagged: bool,
}

impl PendingOptions {
    #[must_use]
    pub fn age(&self, now: SystemTime) -> Duration {
        elapsed(self.created_at, now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetLatch {
    pub widget_id: WidgetId,
    pub title: String,
    pub engaged_at: SystemTime,
    pub last_used: SystemTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutableContext {
    #[default]
    None,
    ChatOptions(PendingOptions),
    FocusedWidget(WidgetLatch),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clarification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_set: Option<OptionSetId>,
    pub question: String,
    pub turns_open: u32,
    /// Position the user named before being asked which source they meant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSuggestion {
    pub candidates: Vec<Candidate>,
    pub message: Option<MessageId>,
    /// Input that produced the suggestion.
    pub input: String,
}

/// Suggestion bookkeeping that is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EphemeralState {
    pub last_suggestion: Option<LastSuggestion>,
    pub rejected: BTreeSet<String>,
}

/// One mutation of session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    ShowOptions {
        candidates: Vec<Candidate>,
        source_message: Option<MessageId>,
        letter_tagged: bool,
    },
    /// Bring back the last shown options as the live context.
    ReshowLastOptions,
    ClearPendingOptions,
    EngageLatch {
        widget_id: WidgetId,
        title: String,
    },
    TouchLatch,
    ReleaseLatch,
    SetLastSuggestion {
        candidates: Vec<Candidate>,
        input: String,
    },
    RejectLastSuggestion,
    ClearSuggestions,
    EnterClarification {
        question: String,
        pending_position: Option<usize>,
    },
    ExitClarification,
    RecordRequest(HistoryEntry),
    RecordAction(HistoryEntry),
}

/// What [`SessionState::reconcile`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub latch_released: Option<WidgetId>,
    pub options_expired: bool,
    pub clarification_expired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub version: u32,
    #[serde(default)]
    executable: ExecutableContext,
    /// Most recently shown chat options, kept for "back to options".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_options: Option<PendingOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clarification: Option<Clarification>,
    #[serde(default)]
    request_history: BoundedHistory,
    #[serde(default)]
    action_history: BoundedHistory,
    #[serde(default)]
    next_option_set: u64,
    #[serde(skip)]
    ephemeral: EphemeralState,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            version: SESSION_STATE_VERSION,
            executable: ExecutableContext::None,
            last_options: None,
            clarification: None,
            request_history: BoundedHistory::default(),
            action_history: BoundedHistory::default(),
            next_option_set: 0,
            ephemeral: EphemeralState::default(),
        }
    }
}

impl SessionState {
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        let mut state = Self::default();
        state.set_history_limit(history_limit);
        state
    }

    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.version == SESSION_STATE_VERSION
    }

    pub fn set_history_limit(&mut self, limit: usize) {
        self.request_history.set_limit(limit);
        self.action_history.set_limit(limit);
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    #[must_use]
    pub fn executable(&self) -> &ExecutableContext {
        &self.executable
    }

    /// Chat options that are registered and still inside their grace window.
    #[must_use]
    pub fn live_chat_options(&self, now: SystemTime, grace: Duration) -> Option<&PendingOptions> {
        match &self.executable {
            ExecutableContext::ChatOptions(options) if options.age(now) <= grace => Some(options),
            _ => None,
        }
    }

    #[must_use]
    pub fn latch(&self) -> Option<&WidgetLatch> {
        match &self.executable {
            ExecutableContext::FocusedWidget(latch) => Some(latch),
            _ => None,
        }
    }

    /// Last shown options if still within `retention`.
    #[must_use]
    pub fn last_options(&self, now: SystemTime, retention: Duration) -> Option<&PendingOptions> {
        self.last_options
            .as_ref()
            .filter(|options| options.age(now) <= retention)
    }

    #[must_use]
    pub fn clarification(&self) -> Option<&Clarification> {
        self.clarification.as_ref()
    }

    #[must_use]
    pub fn request_history(&self) -> &BoundedHistory {
        &self.request_history
    }

    #[must_use]
    pub fn action_history(&self) -> &BoundedHistory {
        &self.action_history
    }

    #[must_use]
    pub fn last_suggestion(&self) -> Option<&LastSuggestion> {
        self.ephemeral.last_suggestion.as_ref()
    }

    #[must_use]
    pub fn rejected(&self) -> &BTreeSet<String> {
        &self.ephemeral.rejected
    }

    #[must_use]
    pub fn is_rejected(&self, label: &str) -> bool {
        self.ephemeral.rejected.contains(&rejection_key(label))
    }

    // ------------------------------------------------------------------
    // Ephemeral hand-off
    // ------------------------------------------------------------------

    pub fn take_ephemeral(&mut self) -> EphemeralState {
        std::mem::take(&mut self.ephemeral)
    }

    pub fn restore_ephemeral(&mut self, ephemeral: EphemeralState) {
        self.ephemeral = ephemeral;
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn allocate_option_set(&mut self) -> OptionSetId {
        self.next_option_set = self.next_option_set.wrapping_add(1);
        OptionSetId::new(self.next_option_set)
    }

    /// Make `context` the single live executable context.
    ///
    /// Clears competing selection state: whatever context was live, and any
    /// clarification that was not about the newly registered option set.
    pub fn register_executable(&mut self, context: ExecutableContext) {
        let keep_clarification = match (&context, &self.clarification) {
            (ExecutableContext::ChatOptions(options), Some(clarification)) => {
                clarification.option_set == Some(options.set_id)
            }
            _ => false,
        };
        if !keep_clarification {
            self.clarification = None;
        }
        if let ExecutableContext::ChatOptions(options) = &context {
            self.last_options = Some(options.clone());
        }
        self.executable = context;
    }

    pub fn apply(&mut self, effect: SessionEffect, now: SystemTime) {
        match effect {
            SessionEffect::ShowOptions {
                candidates,
                source_message,
                letter_tagged,
            } => {
                let set_id = self.allocate_option_set();
                self.register_executable(ExecutableContext::ChatOptions(PendingOptions {
                    set_id,
                    candidates,
                    source_message,
                    created_at: now,
                    letter_tagged,
                }));
            }
            SessionEffect::ReshowLastOptions => {
                if let Some(mut options) = self.last_options.clone() {
                    options.created_at = now;
                    self.register_executable(ExecutableContext::ChatOptions(options));
                }
            }
            SessionEffect::ClearPendingOptions => {
                if matches!(self.executable, ExecutableContext::ChatOptions(_)) {
                    self.executable = ExecutableContext::None;
                }
            }
            SessionEffect::EngageLatch { widget_id, title } => {
                if let ExecutableContext::FocusedWidget(latch) = &mut self.executable
                    && latch.widget_id == widget_id
                {
                    latch.last_used = now;
                    return;
                }
                self.register_executable(ExecutableContext::FocusedWidget(WidgetLatch {
                    widget_id,
                    title,
                    engaged_at: now,
                    last_used: now,
                }));
            }
            SessionEffect::TouchLatch => {
                if let ExecutableContext::FocusedWidget(latch) = &mut self.executable {
                    latch.last_used = now;
                }
            }
            SessionEffect::ReleaseLatch => {
                if matches!(self.executable, ExecutableContext::FocusedWidget(_)) {
                    self.executable = ExecutableContext::None;
                }
            }
            SessionEffect::SetLastSuggestion { candidates, input } => {
                let message = match &self.executable {
                    ExecutableContext::ChatOptions(options) => options.source_message,
                    _ => None,
                };
                self.ephemeral.last_suggestion = Some(LastSuggestion {
                    candidates,
                    message,
                    input,
                });
            }
            SessionEffect::RejectLastSuggestion => {
                if let Some(suggestion) = self.ephemeral.last_suggestion.take() {
                    for candidate in &suggestion.candidates {
                        self.ephemeral.rejected.insert(rejection_key(&candidate.label));
                    }
                }
            }
            SessionEffect::ClearSuggestions => {
                self.ephemeral.last_suggestion = None;
                self.ephemeral.rejected.clear();
            }
            SessionEffect::EnterClarification {
                question,
                pending_position,
            } => {
                let option_set = match &self.executable {
                    ExecutableContext::ChatOptions(options) => Some(options.set_id),
                    _ => None,
                };
                let turns_open = self
                    .clarification
                    .as_ref()
                    .filter(|c| c.option_set == option_set)
                    .map_or(0, |c| c.turns_open);
                self.clarification = Some(Clarification {
                    option_set,
                    question,
                    turns_open,
                    pending_position,
                });
            }
            SessionEffect::ExitClarification => {
                self.clarification = None;
            }
            SessionEffect::RecordRequest(entry) => self.request_history.push(entry),
            SessionEffect::RecordAction(entry) => self.action_history.push(entry),
        }
    }

    pub fn apply_all<I>(&mut self, effects: I, now: SystemTime)
    where
        I: IntoIterator<Item = SessionEffect>,
    {
        for effect in effects {
            self.apply(effect, now);
        }
    }

    /// Turn-start housekeeping against the live UI:
    ///
    /// - release the latch if its widget is gone or it sat idle past its TTL,
    /// - drop chat options past their grace window,
    /// - forget last options past retention,
    /// - count the turn against an open clarification and close it once it
    ///   has been open for the configured maximum.
    pub fn reconcile(&mut self, ui: &UiContext, tuning: &Tuning, now: SystemTime) -> Reconciled {
        let mut report = Reconciled::default();
        let decay = &tuning.decay;

        match &self.executable {
            ExecutableContext::FocusedWidget(latch) => {
                let visible = ui.widget(&latch.widget_id).is_some();
                let idle = decay
                    .latch_idle_ttl
                    .is_some_and(|ttl| elapsed(latch.last_used, now) > ttl);
                if !visible || idle {
                    report.latch_released = Some(latch.widget_id.clone());
                    self.executable = ExecutableContext::None;
                }
            }
            ExecutableContext::ChatOptions(options) => {
                if options.age(now) > decay.pending_options_grace {
                    report.options_expired = true;
                    self.executable = ExecutableContext::None;
                }
            }
            ExecutableContext::None => {}
        }

        if self
            .last_options
            .as_ref()
            .is_some_and(|o| o.age(now) > decay.last_options_retention)
        {
            self.last_options = None;
        }

        if let Some(clarification) = &mut self.clarification {
            clarification.turns_open += 1;
            if clarification.turns_open > tuning.clarification_max_turns {
                report.clarification_expired = true;
                self.clarification = None;
            }
        }

        report
    }
}
