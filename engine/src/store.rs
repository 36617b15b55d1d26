//! Session persistence, keyed by conversation id.
//!
//! Stores hold serialized [`SessionState`] only; suggestion bookkeeping is
//! skipped by serde and lives in the engine's memory.

use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::RwLock;

use tempfile::NamedTempFile;
use thiserror::Error;

use waypoint_core::SessionState;
use waypoint_types::ConversationId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session state is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

pub type StoreFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

pub trait SessionStore: Send + Sync {
    /// `None` when the conversation has no saved state yet.
    fn load<'a>(&'a self, conversation: &'a ConversationId) -> StoreFut<'a, Option<SessionState>>;

    fn save<'a>(
        &'a self,
        conversation: &'a ConversationId,
        state: &'a SessionState,
    ) -> StoreFut<'a, ()>;
}

// ============================================================================
// In-memory
// ============================================================================

/// Keeps each conversation as a JSON string, so a round trip behaves the same
/// as a real backend.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<ConversationId, String>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored JSON, for inspection.
    #[must_use]
    pub fn raw(&self, conversation: &ConversationId) -> Option<String> {
        self.sessions.read().ok()?.get(conversation).cloned()
    }

    /// Overwrite the stored JSON directly.
    pub fn put_raw(&self, conversation: &ConversationId, json: impl Into<String>) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(conversation.clone(), json.into());
        }
    }

    fn load_sync(&self, conversation: &ConversationId) -> Result<Option<SessionState>, StoreError> {
        let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        sessions
            .get(conversation)
            .map(|json| serde_json::from_str(json))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save_sync(
        &self,
        conversation: &ConversationId,
        state: &SessionState,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        self.sessions
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(conversation.clone(), json);
        Ok(())
    }
}

impl SessionStore for InMemorySessionStore {
    fn load<'a>(&'a self, conversation: &'a ConversationId) -> StoreFut<'a, Option<SessionState>> {
        let result = self.load_sync(conversation);
        Box::pin(async move { result })
    }

    fn save<'a>(
        &'a self,
        conversation: &'a ConversationId,
        state: &'a SessionState,
    ) -> StoreFut<'a, ()> {
        let result = self.save_sync(conversation, state);
        Box::pin(async move { result })
    }
}

// ============================================================================
// Files
// ============================================================================

/// One pretty-printed JSON file per conversation, written atomically.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, conversation: &ConversationId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(conversation.as_str())))
    }

    fn load_sync(&self, conversation: &ConversationId) -> Result<Option<SessionState>, StoreError> {
        let path = self.path_for(conversation);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save_sync(
        &self,
        conversation: &ConversationId,
        state: &SessionState,
    ) -> Result<(), StoreError> {
        let path = self.path_for(conversation);
        let bytes = serde_json::to_vec_pretty(state)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| err.error)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved session state");
        Ok(())
    }
}

/// Conversation ids are host-supplied; keep file names to a safe alphabet.
fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "_".to_string() } else { stem }
}

impl SessionStore for FileSessionStore {
    fn load<'a>(&'a self, conversation: &'a ConversationId) -> StoreFut<'a, Option<SessionState>> {
        Box::pin(async move { self.load_sync(conversation) })
    }

    fn save<'a>(
        &'a self,
        conversation: &'a ConversationId,
        state: &'a SessionState,
    ) -> StoreFut<'a, ()> {
        Box::pin(async move { self.save_sync(conversation, state) })
    }
}
