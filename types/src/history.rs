//! Request and action history.
//!
//! Two separate bounded, newest-first lists live in session state: one for
//! what the user asked for and one for what was actually executed. They share
//! an entry shape but are never merged; "did I ask you to..." only reads
//! requests and "did you open..." only reads actions.

use std::collections::VecDeque;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::action::{Action, TargetType};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Open,
    Navigate,
    Select,
    Lookup,
}

impl HistoryKind {
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Navigate => "go to",
            Self::Select => "select",
            Self::Lookup => "look up",
        }
    }

    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Open => "opened",
            Self::Navigate => "went to",
            Self::Select => "selected",
            Self::Lookup => "looked up",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub target_type: TargetType,
    pub target_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub timestamp: SystemTime,
}

impl HistoryEntry {
    #[must_use]
    pub fn for_action(kind: HistoryKind, action: &Action, timestamp: SystemTime) -> Self {
        Self {
            kind,
            target_type: action.target_type(),
            target_name: action.target_name().to_string(),
            target_id: action.target_id().map(str::to_string),
            timestamp,
        }
    }
}

/// Newest-first list that drops its oldest entries past `limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedHistory {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl Default for BoundedHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl BoundedHistory {
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.entries.truncate(self.limit);
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
