//! Where the transcript comes from.
//!
//! The host owns conversation storage. The engine asks a [`ContextSource`]
//! for the most recent messages of one conversation, with a window size that
//! grows only on the single need-context retry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use thiserror::Error;

use waypoint_types::{ChatMessage, ConversationId, MessageId};

#[derive(Debug, Error)]
pub enum ContextSourceError {
    #[error("conversation {0} is not available")]
    Unavailable(ConversationId),
    #[error("transcript backend error: {0}")]
    Backend(String),
}

pub type SourceFut<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ChatMessage>, ContextSourceError>> + Send + 'a>>;

pub trait ContextSource: Send + Sync {
    /// Up to `limit` most recent messages, oldest first.
    fn recent_messages<'a>(&'a self, conversation: &'a ConversationId, limit: usize)
    -> SourceFut<'a>;
}

/// Transcript kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTranscript {
    conversations: RwLock<HashMap<ConversationId, Vec<ChatMessage>>>,
}

impl InMemoryTranscript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, conversation: &ConversationId, message: ChatMessage) {
        if let Ok(mut map) = self.conversations.write() {
            map.entry(conversation.clone()).or_default().push(message);
        }
    }

    /// Id to use for the next message in `conversation`.
    #[must_use]
    pub fn next_message_id(&self, conversation: &ConversationId) -> MessageId {
        let next = self
            .conversations
            .read()
            .ok()
            .and_then(|map| map.get(conversation).and_then(|m| m.last()).map(|m| m.id.value()))
            .map_or(1, |last| last + 1);
        MessageId::new(next)
    }

    #[must_use]
    pub fn len(&self, conversation: &ConversationId) -> usize {
        self.conversations
            .read()
            .map(|map| map.get(conversation).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn window(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ContextSourceError> {
        let map = self
            .conversations
            .read()
            .map_err(|_| ContextSourceError::Backend("transcript lock poisoned".to_string()))?;
        let Some(messages) = map.get(conversation) else {
            return Ok(Vec::new());
        };
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}

impl ContextSource for InMemoryTranscript {
    fn recent_messages<'a>(
        &'a self,
        conversation: &'a ConversationId,
        limit: usize,
    ) -> SourceFut<'a> {
        let result = self.window(conversation, limit);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[tokio::test]
    async fn returns_newest_window_oldest_first() {
        let transcript = InMemoryTranscript::new();
        let conv = ConversationId::new("c1");
        for i in 1..=5 {
            transcript.append(&conv, ChatMessage::user(i, format!("m{i}"), SystemTime::now()));
        }

        let window = transcript.recent_messages(&conv, 2).await.unwrap();
        let texts: Vec<_> = window.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["m4", "m5"]);
        assert_eq!(transcript.next_message_id(&conv), MessageId::new(6));
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let transcript = InMemoryTranscript::new();
        let window = transcript
            .recent_messages(&ConversationId::new("nope"), 10)
            .await
            .unwrap();
        assert!(window.is_empty());
        assert_eq!(transcript.len(&ConversationId::new("nope")), 0);
    }
}
