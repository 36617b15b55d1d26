//! Core domain types for Waypoint.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be shared by the context builder, the matchers, the router and
//! the LLM bridge.

#![allow(clippy::missing_errors_doc)]

pub mod action;
pub mod candidate;
pub mod context;
pub mod history;
pub mod ids;
pub mod manifest;
pub mod message;
pub mod text;

pub use action::{Action, EntityType, GeneralTopic, NavTarget, Resolution, TargetType, UserScope};
pub use candidate::Candidate;
pub use context::{
    ChatContext, ContextField, MAX_OPEN_ITEMS, MAX_VISIBLE_WIDGETS, MAX_WIDGET_ITEMS, OpenItem,
    UiContext, UiMode, WidgetSummary,
};
pub use history::{BoundedHistory, DEFAULT_HISTORY_LIMIT, HistoryEntry, HistoryKind};
pub use ids::{CandidateId, ConversationId, MessageId, OptionSetId, PanelId, TurnId, WidgetId};
pub use manifest::{MANIFEST_VERSION, ManifestIntent, PanelManifest, VisiblePanel};
pub use message::{ChatMessage, ListPreview, PanelRef, Role};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// NonEmpty String Types
// ============================================================================

/// A string guaranteed to be non-empty (after trimming).
///
/// User utterances enter the engine through this type, so every tier can rely
/// on having at least one non-whitespace character to work with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("utterance must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::NonEmptyString;

    #[test]
    fn whitespace_is_rejected() {
        assert!(NonEmptyString::new("   ").is_err());
        assert!(NonEmptyString::new("").is_err());
    }

    #[test]
    fn content_is_preserved_untrimmed() {
        let s = NonEmptyString::new(" open panel e ").unwrap();
        assert_eq!(s.as_str(), " open panel e ");
    }

    #[test]
    fn deserialize_rejects_empty() {
        let parsed: Result<NonEmptyString, _> = serde_json::from_str("\"  \"");
        assert!(parsed.is_err());
    }
}
