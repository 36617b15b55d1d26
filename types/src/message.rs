//! Chat transcript model as seen by the context builder.
//!
//! Messages are owned by the host's conversation store; the engine only reads
//! a recent window of them. Constructors take `SystemTime` explicitly; callers
//! own the clock.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::ids::{MessageId, PanelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A preview of a list the assistant rendered inline (e.g. "your recent
/// entries"). Only titles are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPreview {
    pub title: String,
    pub items: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRef {
    pub panel_id: PanelId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub timestamp: SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Candidate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_preview: Option<ListPreview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_panel: Option<PanelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatMessage {
    #[must_use]
    pub fn user(id: u64, text: impl Into<String>, timestamp: SystemTime) -> Self {
        Self::plain(id, Role::User, text, timestamp)
    }

    #[must_use]
    pub fn assistant(id: u64, text: impl Into<String>, timestamp: SystemTime) -> Self {
        Self::plain(id, Role::Assistant, text, timestamp)
    }

    fn plain(id: u64, role: Role, text: impl Into<String>, timestamp: SystemTime) -> Self {
        Self {
            id: MessageId::new(id),
            role,
            text: text.into(),
            timestamp,
            options: None,
            list_preview: None,
            opened_panel: None,
            error: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<Candidate>) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn with_list_preview(mut self, preview: ListPreview) -> Self {
        self.list_preview = Some(preview);
        self
    }

    #[must_use]
    pub fn with_opened_panel(
        mut self,
        panel_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.opened_panel = Some(PanelRef {
            panel_id: PanelId::new(panel_id),
            title: title.into(),
        });
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}
