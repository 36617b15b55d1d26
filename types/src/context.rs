//! Per-turn context snapshots.
//!
//! [`ChatContext`] is historical: every field remembers how old it is and
//! whether it has decayed. [`UiContext`] is a live read of what is on screen
//! right now and never decays.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::ids::{MessageId, WidgetId};
use crate::message::{ListPreview, PanelRef};

/// Maximum widgets carried in a [`UiContext`].
pub const MAX_VISIBLE_WIDGETS: usize = 10;
/// Maximum open items carried in a [`UiContext`].
pub const MAX_OPEN_ITEMS: usize = 5;
/// Maximum item candidates kept per widget summary.
pub const MAX_WIDGET_ITEMS: usize = 20;

/// A context value together with where it came from and how old it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextField<T> {
    pub value: T,
    pub source: MessageId,
    pub age: Duration,
    pub stale: bool,
}

impl<T> ContextField<T> {
    /// The value, only if it has not decayed.
    #[must_use]
    pub fn fresh(&self) -> Option<&T> {
        if self.stale { None } else { Some(&self.value) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    pub last_assistant_message: Option<String>,
    pub last_user_message: Option<String>,
    pub last_options: Option<ContextField<Vec<Candidate>>>,
    pub last_list_preview: Option<ContextField<ListPreview>>,
    pub last_opened_panel: Option<ContextField<PanelRef>>,
    pub last_error_message: Option<ContextField<String>>,
}

impl ChatContext {
    #[must_use]
    pub fn options_age(&self) -> Option<Duration> {
        self.last_options.as_ref().map(|f| f.age)
    }

    #[must_use]
    pub fn opened_panel_age(&self) -> Option<Duration> {
        self.last_opened_panel.as_ref().map(|f| f.age)
    }

    #[must_use]
    pub fn fresh_options(&self) -> Option<&[Candidate]> {
        self.last_options
            .as_ref()
            .and_then(ContextField::fresh)
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn fresh_list_preview(&self) -> Option<&ListPreview> {
        self.last_list_preview.as_ref().and_then(ContextField::fresh)
    }

    #[must_use]
    pub fn fresh_opened_panel(&self) -> Option<&PanelRef> {
        self.last_opened_panel.as_ref().and_then(ContextField::fresh)
    }

    #[must_use]
    pub fn fresh_error(&self) -> Option<&str> {
        self.last_error_message
            .as_ref()
            .and_then(ContextField::fresh)
            .map(String::as_str)
    }

    /// True when no decaying field is both present and fresh, i.e. nothing
    /// remembered from the transcript is still usable to answer from.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.fresh_options().is_none()
            && self.fresh_list_preview().is_none()
            && self.fresh_opened_panel().is_none()
            && self.fresh_error().is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiMode {
    #[default]
    Dashboard,
    Workspace,
    Entry,
    Settings,
}

impl UiMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Workspace => "workspace",
            Self::Entry => "entry",
            Self::Settings => "settings",
        }
    }
}

/// Metadata-only view of a visible widget. No content bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSummary {
    pub id: WidgetId,
    pub title: String,
    pub kind: String,
    pub item_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenItem {
    pub id: String,
    pub title: String,
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiContext {
    pub mode: UiMode,
    pub visible_widgets: Vec<WidgetSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_drawer: Option<PanelRef>,
    pub open_items: Vec<OpenItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_item_id: Option<String>,
    /// Widget currently holding UI focus, as reported by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_widget: Option<WidgetId>,
}

impl UiContext {
    #[must_use]
    pub fn widget(&self, id: &WidgetId) -> Option<&WidgetSummary> {
        self.visible_widgets.iter().find(|w| &w.id == id)
    }

    /// The focused widget, if it is visible and has selectable items.
    #[must_use]
    pub fn focused_selectable_widget(&self) -> Option<&WidgetSummary> {
        self.focused_widget
            .as_ref()
            .and_then(|id| self.widget(id))
            .filter(|w| !w.items.is_empty())
    }

    #[must_use]
    pub fn active_item(&self) -> Option<&OpenItem> {
        let active = self.active_item_id.as_deref()?;
        self.open_items.iter().find(|item| item.id == active)
    }
}
