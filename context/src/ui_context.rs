//! Live UI snapshot to [`UiContext`].
//!
//! The host reports everything it has on screen, bodies included. The
//! context keeps metadata only and caps each collection so a crowded
//! dashboard cannot blow up a bridge prompt.

use serde::{Deserialize, Serialize};

use waypoint_types::{
    Candidate, MAX_OPEN_ITEMS, MAX_VISIBLE_WIDGETS, MAX_WIDGET_ITEMS, OpenItem, PanelRef,
    UiContext, UiMode, WidgetId, WidgetSummary,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSnapshot {
    pub id: WidgetId,
    pub title: String,
    pub kind: String,
    #[serde(default)]
    pub items: Vec<Candidate>,
    /// Rendered content. Never forwarded into context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl WidgetSnapshot {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: WidgetId::new(id),
            title: title.into(),
            kind: kind.into(),
            items: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_items(mut self, items: Vec<Candidate>) -> Self {
        self.items = items;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSnapshot {
    pub mode: UiMode,
    #[serde(default)]
    pub widgets: Vec<WidgetSnapshot>,
    #[serde(default)]
    pub open_drawer: Option<PanelRef>,
    #[serde(default)]
    pub open_items: Vec<OpenItem>,
    #[serde(default)]
    pub active_item_id: Option<String>,
    #[serde(default)]
    pub focused_widget: Option<WidgetId>,
}

impl UiSnapshot {
    #[must_use]
    pub fn with_widget(mut self, widget: WidgetSnapshot) -> Self {
        self.widgets.push(widget);
        self
    }

    #[must_use]
    pub fn with_focus(mut self, widget: impl Into<String>) -> Self {
        self.focused_widget = Some(WidgetId::new(widget));
        self
    }
}

fn summarize(widget: &WidgetSnapshot) -> WidgetSummary {
    WidgetSummary {
        id: widget.id.clone(),
        title: widget.title.clone(),
        kind: widget.kind.clone(),
        item_count: widget.items.len(),
        items: widget.items.iter().take(MAX_WIDGET_ITEMS).cloned().collect(),
    }
}

#[must_use]
pub fn build_ui_context(snapshot: &UiSnapshot) -> UiContext {
    let visible_widgets: Vec<WidgetSummary> = snapshot
        .widgets
        .iter()
        .take(MAX_VISIBLE_WIDGETS)
        .map(summarize)
        .collect();

    // Focus on a widget that did not make the cut is dropped with it.
    let focused_widget = snapshot
        .focused_widget
        .clone()
        .filter(|id| visible_widgets.iter().any(|w| &w.id == id));

    UiContext {
        mode: snapshot.mode,
        visible_widgets,
        open_drawer: snapshot.open_drawer.clone(),
        open_items: snapshot.open_items.iter().take(MAX_OPEN_ITEMS).cloned().collect(),
        active_item_id: snapshot.active_item_id.clone(),
        focused_widget,
    }
}
