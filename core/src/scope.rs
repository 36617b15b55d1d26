//! Scope-cue detection: explicit re-anchoring to chat options or to a
//! specific widget. A cue always beats any latched or default context.

use crate::normalize::fold;
use waypoint_types::{UiContext, WidgetId};

const CHAT_CUES: &[&str] = &[
    "from the chat options",
    "from chat options",
    "from the chat",
    "from chat",
    "in the chat",
    "in chat",
    "from the options",
    "from options",
    "from your options",
    "from the list you gave",
    "back to options",
    "back to the options",
    "chat options",
];

const GENERIC_WIDGET_CUES: &[&str] = &[
    "from the widget",
    "from widget",
    "in the widget",
    "in widget",
    "on the widget",
];

const WIDGET_PREPOSITIONS: &[&str] = &["from the", "from", "in the", "in", "on the", "on"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeCue {
    None,
    Chat { remainder: String },
    Widget { id: WidgetId, remainder: String },
}

impl ScopeCue {
    #[must_use]
    pub fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Remove `phrase` from `folded` on word boundaries. `None` if absent.
fn cut(folded: &str, phrase: &str) -> Option<String> {
    let padded = format!(" {folded} ");
    let needle = format!(" {phrase} ");
    let at = padded.find(&needle)?;
    let rest = format!("{} {}", &padded[..at], &padded[at + needle.len()..]);
    Some(rest.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[must_use]
pub fn detect_scope_cue(input: &str, ui: &UiContext) -> ScopeCue {
    let folded = fold(input);

    for cue in CHAT_CUES {
        if let Some(remainder) = cut(&folded, cue) {
            return ScopeCue::Chat { remainder };
        }
    }

    for widget in &ui.visible_widgets {
        let title = fold(&widget.title);
        if title.is_empty() {
            continue;
        }
        for prep in WIDGET_PREPOSITIONS {
            if let Some(remainder) = cut(&folded, &format!("{prep} {title}")) {
                return ScopeCue::Widget {
                    id: widget.id.clone(),
                    remainder,
                };
            }
        }
    }

    if let Some(focused) = &ui.focused_widget {
        for cue in GENERIC_WIDGET_CUES {
            if let Some(remainder) = cut(&folded, cue) {
                return ScopeCue::Widget {
                    id: focused.clone(),
                    remainder,
                };
            }
        }
    }

    ScopeCue::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::WidgetSummary;

    fn ui() -> UiContext {
        UiContext {
            visible_widgets: vec![WidgetSummary {
                id: WidgetId::new("w-d"),
                title: "Widget D".to_string(),
                kind: "list".to_string(),
                item_count: 3,
                items: Vec::new(),
            }],
            focused_widget: Some(WidgetId::new("w-d")),
            ..UiContext::default()
        }
    }

    #[test]
    fn chat_cue_with_remainder() {
        assert_eq!(
            detect_scope_cue("the second one from chat", &ui()),
            ScopeCue::Chat {
                remainder: "the second one".to_string()
            }
        );
    }

    #[test]
    fn named_widget_cue() {
        assert_eq!(
            detect_scope_cue("first one in widget d", &ui()),
            ScopeCue::Widget {
                id: WidgetId::new("w-d"),
                remainder: "first one".to_string()
            }
        );
    }

    #[test]
    fn generic_widget_cue_uses_focus() {
        assert!(matches!(
            detect_scope_cue("2 from the widget", &ui()),
            ScopeCue::Widget { id, .. } if id.as_str() == "w-d"
        ));
    }

    #[test]
    fn cues_respect_word_boundaries() {
        assert_eq!(detect_scope_cue("open chatroom", &ui()), ScopeCue::None);
        assert_eq!(detect_scope_cue("the second one", &ui()), ScopeCue::None);
    }
}
