//! Context Bundle Builder.
//!
//! Two snapshots are taken per turn:
//!
//! ```text
//! ContextBundle
//! ├── chat: ChatContext   (historical, reverse-scanned, per-field decay)
//! └── ui:   UiContext     (live, capped, metadata only, never decays)
//! ```
//!
//! Transcript access goes through [`ContextSource`]; failures degrade to an
//! empty window rather than failing the turn.

mod chat_context;
mod source;
mod ui_context;

use std::time::SystemTime;

pub use chat_context::build_chat_context;
pub use source::{ContextSource, ContextSourceError, InMemoryTranscript, SourceFut};
pub use ui_context::{UiSnapshot, WidgetSnapshot, build_ui_context};

use waypoint_config::DecayWindows;
use waypoint_types::{ChatContext, ConversationId, UiContext};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBundle {
    pub chat: ChatContext,
    pub ui: UiContext,
    /// Messages read to build `chat`.
    pub window: usize,
}

/// Read the chat window for `conversation` and build its context.
pub async fn load_chat_context(
    source: &dyn ContextSource,
    conversation: &ConversationId,
    limit: usize,
    now: SystemTime,
    windows: &DecayWindows,
) -> ChatContext {
    match source.recent_messages(conversation, limit).await {
        Ok(messages) => build_chat_context(&messages, now, windows),
        Err(err) => {
            tracing::warn!(
                conversation = %conversation,
                error = %err,
                "Transcript unavailable; using empty chat context"
            );
            ChatContext::default()
        }
    }
}

pub async fn assemble(
    source: &dyn ContextSource,
    conversation: &ConversationId,
    ui: &UiSnapshot,
    limit: usize,
    now: SystemTime,
    windows: &DecayWindows,
) -> ContextBundle {
    ContextBundle {
        chat: load_chat_context(source, conversation, limit, now, windows).await,
        ui: build_ui_context(ui),
        window: limit,
    }
}
