//! Validated actions and turn resolutions.
//!
//! The engine only ever hands the host one of the closed [`Resolution`]
//! variants. There is deliberately no variant carrying free-form text to be
//! executed: text only appears as reply content.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::PanelId;

/// Kind of thing a navigation or lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Home,
    Dashboard,
    Workspace,
    Entry,
    Note,
    Panel,
    Widget,
    Item,
}

impl TargetType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Dashboard => "dashboard",
            Self::Workspace => "workspace",
            Self::Entry => "entry",
            Self::Note => "note",
            Self::Panel => "panel",
            Self::Widget => "widget",
            Self::Item => "item",
        }
    }

    /// Parse a (singular, lowercase) noun into a target type.
    #[must_use]
    pub fn from_noun(noun: &str) -> Option<Self> {
        match noun {
            "home" => Some(Self::Home),
            "dashboard" => Some(Self::Dashboard),
            "workspace" => Some(Self::Workspace),
            "entry" => Some(Self::Entry),
            "note" => Some(Self::Note),
            "panel" | "drawer" => Some(Self::Panel),
            "widget" => Some(Self::Widget),
            "item" => Some(Self::Item),
            _ => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavTarget {
    pub target_type: TargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub target_name: String,
}

/// What a command or candidate does when chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Navigate { target: NavTarget },
    OpenPanel { panel_id: PanelId, title: String },
}

impl Action {
    #[must_use]
    pub fn open_panel(panel_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::OpenPanel {
            panel_id: PanelId::new(panel_id),
            title: title.into(),
        }
    }

    #[must_use]
    pub fn navigate(target_type: TargetType, target_name: impl Into<String>) -> Self {
        Self::Navigate {
            target: NavTarget {
                target_type,
                target_id: None,
                target_name: target_name.into(),
            },
        }
    }

    /// The panel this action opens, if any.
    #[must_use]
    pub fn panel_id(&self) -> Option<&PanelId> {
        match self {
            Self::OpenPanel { panel_id, .. } => Some(panel_id),
            Self::Navigate { .. } => None,
        }
    }

    #[must_use]
    pub fn target_type(&self) -> TargetType {
        match self {
            Self::Navigate { target } => target.target_type,
            Self::OpenPanel { .. } => TargetType::Panel,
        }
    }

    #[must_use]
    pub fn target_name(&self) -> &str {
        match self {
            Self::Navigate { target } => &target.target_name,
            Self::OpenPanel { title, .. } => title,
        }
    }

    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Navigate { target } => target.target_id.as_deref(),
            Self::OpenPanel { panel_id, .. } => Some(panel_id.as_str()),
        }
    }
}

/// Entity categories the app-data lookup understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Widget,
    Workspace,
    Entry,
    Note,
    Panel,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Widget => "widget",
            Self::Workspace => "workspace",
            Self::Entry => "entry",
            Self::Note => "note",
            Self::Panel => "panel",
        }
    }

    #[must_use]
    pub fn from_noun(noun: &str) -> Option<Self> {
        match noun {
            "widget" => Some(Self::Widget),
            "workspace" => Some(Self::Workspace),
            "entry" => Some(Self::Entry),
            "note" => Some(Self::Note),
            "panel" => Some(Self::Panel),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission scope for app-data lookups: always the current user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserScope {
    pub user_id: String,
}

impl UserScope {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Topic of a general (non-app) answer produced by intent classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralTopic {
    Time,
    Math,
    Knowledge,
}

/// The single outcome of a resolved turn, handed to the action executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    Navigate {
        target: NavTarget,
    },
    OpenPanel {
        panel_id: PanelId,
        title: String,
    },
    AnswerFromContext {
        answer: String,
    },
    GeneralAnswer {
        topic: GeneralTopic,
        answer: String,
    },
    RetrieveFromApp {
        entity_type: EntityType,
        name: String,
        scope: UserScope,
    },
    Unsupported {
        reason: String,
    },
}

impl Resolution {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::OpenPanel { .. } => "open_panel",
            Self::AnswerFromContext { .. } => "answer_from_context",
            Self::GeneralAnswer { .. } => "general_answer",
            Self::RetrieveFromApp { .. } => "retrieve_from_app",
            Self::Unsupported { .. } => "unsupported",
        }
    }

    /// True for resolutions that change what the user is looking at.
    #[must_use]
    pub const fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigate { .. } | Self::OpenPanel { .. })
    }

    /// The action this resolution carries out, if it is a navigation.
    #[must_use]
    pub fn as_action(&self) -> Option<Action> {
        match self {
            Self::Navigate { target } => Some(Action::Navigate {
                target: target.clone(),
            }),
            Self::OpenPanel { panel_id, title } => Some(Action::OpenPanel {
                panel_id: panel_id.clone(),
                title: title.clone(),
            }),
            _ => None,
        }
    }
}

impl From<Action> for Resolution {
    fn from(action: Action) -> Self {
        match action {
            Action::Navigate { target } => Self::Navigate { target },
            Action::OpenPanel { panel_id, title } => Self::OpenPanel { panel_id, title },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_serializes_with_tag() {
        let resolution = Resolution::from(Action::open_panel("panel-e", "Panel E"));
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["type"], "open_panel");
        assert_eq!(json["panel_id"], "panel-e");
    }

    #[test]
    fn action_round_trips_through_resolution() {
        let action = Action::navigate(TargetType::Workspace, "Research");
        let resolution = Resolution::from(action.clone());
        assert!(resolution.is_navigation());
        assert_eq!(resolution.as_action(), Some(action));
    }

    #[test]
    fn answers_are_not_navigation() {
        let resolution = Resolution::AnswerFromContext {
            answer: "No, only D and E.".to_string(),
        };
        assert!(!resolution.is_navigation());
        assert_eq!(resolution.tag(), "answer_from_context");
    }

    #[test]
    fn nouns_parse_to_types() {
        assert_eq!(TargetType::from_noun("drawer"), Some(TargetType::Panel));
        assert_eq!(EntityType::from_noun("note"), Some(EntityType::Note));
        assert_eq!(EntityType::from_noun("banana"), None);
    }
}
