//! Vocabulary Builder.
//!
//! Merges, in this order:
//!
//! 1. the static core commands,
//! 2. one command per visible panel/badge whose id matches
//!    `panel-*`, `widget-*` or `badge-*` (skipped when a static command
//!    already opens that panel),
//! 3. one command per compatible third-party manifest (skipped when the id
//!    is already taken).
//!
//! Output order follows input order; nothing iterates an unordered map, so
//! identical inputs give identical output.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::normalize::normalize;
use waypoint_types::{Action, PanelManifest, TargetType, VisiblePanel};

const VERB_PREFIXES: &[&str] = &["show", "open", "view", "my"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    Core,
    Panel,
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDef {
    pub id: String,
    pub label: String,
    /// Normalized phrases, deduplicated, in insertion order.
    pub phrases: Vec<String>,
    pub action: Action,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
    pub source: CommandSource,
}

impl CommandDef {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, action: Action) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            phrases: Vec::new(),
            action,
            params: Value::Null,
            source: CommandSource::Core,
        }
    }

    #[must_use]
    pub fn with_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in phrases {
            self.add_phrase(phrase.as_ref());
        }
        self
    }

    fn add_phrase(&mut self, phrase: &str) {
        let normalized = normalize(phrase);
        if !normalized.is_empty() && !self.phrases.contains(&normalized) {
            self.phrases.push(normalized);
        }
    }

    fn with_title_variants(mut self, title: &str) -> Self {
        self.add_phrase(title);
        for verb in VERB_PREFIXES {
            self.add_phrase(&format!("{verb} {title}"));
        }
        self
    }

    #[must_use]
    pub fn matches_phrase(&self, normalized: &str) -> bool {
        self.phrases.iter().any(|p| p == normalized)
    }
}

/// Static commands every deployment has.
#[must_use]
pub fn core_commands() -> Vec<CommandDef> {
    vec![
        CommandDef::new("home", "Home", Action::navigate(TargetType::Home, "Home"))
            .with_phrases(["home", "go home", "take me home", "main page"]),
        CommandDef::new(
            "dashboard",
            "Dashboard",
            Action::navigate(TargetType::Dashboard, "Dashboard"),
        )
        .with_phrases(["dashboard", "go to dashboard", "show dashboard", "open dashboard"]),
        CommandDef::new(
            "workspaces",
            "Workspaces",
            Action::open_panel("panel-workspaces", "Workspaces"),
        )
        .with_phrases([
            "workspaces",
            "show workspaces",
            "open workspaces",
            "list workspaces",
            "my workspaces",
        ]),
        CommandDef::new(
            "recent",
            "Recent Entries",
            Action::open_panel("panel-recent", "Recent Entries"),
        )
        .with_phrases([
            "recent",
            "recent entries",
            "show recent",
            "open recent",
            "show recent entries",
            "my recent entries",
        ]),
        CommandDef::new(
            "notes",
            "Quick Notes",
            Action::open_panel("panel-notes", "Quick Notes"),
        )
        .with_phrases(["notes", "quick notes", "open notes", "show notes", "my notes"]),
        CommandDef::new(
            "settings",
            "Settings",
            Action::open_panel("panel-settings", "Settings"),
        )
        .with_phrases(["settings", "open settings", "show settings", "preferences"]),
    ]
}

fn panel_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:panel|widget|badge)[-_][a-z0-9][a-z0-9_-]*$")
            .expect("panel id pattern is valid")
    })
}

fn opens_panel(commands: &[CommandDef], panel_id: &str) -> bool {
    commands
        .iter()
        .any(|c| c.action.panel_id().is_some_and(|id| id.as_str() == panel_id))
}

fn panel_command(panel: &VisiblePanel) -> CommandDef {
    let mut command = CommandDef::new(
        panel.id.as_str(),
        panel.title.clone(),
        Action::open_panel(panel.id.as_str(), panel.title.clone()),
    )
    .with_title_variants(&panel.title);
    command.source = CommandSource::Panel;
    command
}

fn manifest_command(manifest: &PanelManifest) -> CommandDef {
    let mut command = CommandDef::new(
        manifest.panel_id.as_str(),
        manifest.title.clone(),
        Action::open_panel(manifest.panel_id.as_str(), manifest.title.clone()),
    )
    .with_title_variants(&manifest.title);

    let mut intents = Map::new();
    for intent in &manifest.intents {
        for example in &intent.examples {
            command.add_phrase(example);
        }
        intents.insert(intent.name.clone(), intent.params_schema.clone());
    }
    if !intents.is_empty() {
        command.params = Value::Object(intents);
    }
    command.source = CommandSource::Manifest;
    command
}

/// Merge core, visible-panel and manifest commands into one flat list.
#[must_use]
pub fn build(
    core: &[CommandDef],
    visible_panels: &[VisiblePanel],
    manifests: &[PanelManifest],
) -> Vec<CommandDef> {
    let mut commands: Vec<CommandDef> = core.to_vec();
    let mut ids: BTreeSet<String> = commands.iter().map(|c| c.id.clone()).collect();

    for panel in visible_panels {
        let id = panel.id.as_str();
        if !panel_id_pattern().is_match(id) {
            tracing::debug!(
                panel = id,
                "Visible panel id does not match a known pattern; skipping"
            );
            continue;
        }
        if ids.contains(id) || opens_panel(&commands, id) {
            continue;
        }
        ids.insert(id.to_string());
        commands.push(panel_command(panel));
    }

    for manifest in manifests {
        let id = manifest.panel_id.as_str();
        if !manifest.is_compatible() {
            tracing::warn!(
                panel = id,
                version = manifest.version,
                "Ignoring manifest with incompatible version"
            );
            continue;
        }
        if ids.contains(id) || opens_panel(&commands, id) {
            continue;
        }
        ids.insert(id.to_string());
        commands.push(manifest_command(manifest));
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::{MANIFEST_VERSION, ManifestIntent, PanelId};

    fn manifest(id: &str, title: &str, version: u32) -> PanelManifest {
        PanelManifest {
            version,
            panel_id: PanelId::new(id),
            title: title.to_string(),
            intents: vec![ManifestIntent {
                name: "add_todo".to_string(),
                examples: vec!["add a todo".to_string()],
                params_schema: serde_json::json!({"type": "object"}),
            }],
        }
    }

    #[test]
    fn visible_panel_gets_verb_variants() {
        let commands = build(
            &core_commands(),
            &[VisiblePanel::new("widget-demo", "Demo Widget")],
            &[],
        );
        let demo = commands.iter().find(|c| c.id == "widget-demo").unwrap();
        assert_eq!(
            demo.phrases,
            [
                "demo widget",
                "show demo widget",
                "open demo widget",
                "view demo widget",
                "my demo widget"
            ]
        );
        assert_eq!(demo.source, CommandSource::Panel);
    }

    #[test]
    fn panels_covered_by_core_are_skipped() {
        let commands = build(
            &core_commands(),
            &[VisiblePanel::new("panel-recent", "Recent")],
            &[],
        );
        assert_eq!(commands.len(), core_commands().len());
    }

    #[test]
    fn unknown_id_patterns_are_skipped() {
        let commands = build(&[], &[VisiblePanel::new("sidebar", "Sidebar")], &[]);
        assert!(commands.is_empty());
    }

    #[test]
    fn manifests_are_version_checked_and_deduplicated() {
        let commands = build(
            &core_commands(),
            &[VisiblePanel::new("panel-todo", "Todo")],
            &[
                manifest("panel-todo", "Todo", MANIFEST_VERSION),
                manifest("panel-old", "Old", MANIFEST_VERSION + 1),
                manifest("panel-tasks", "Tasks", MANIFEST_VERSION),
            ],
        );
        let ids: Vec<_> = commands.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.iter().filter(|id| **id == "panel-todo").count(), 1);
        assert!(!ids.contains(&"panel-old"));
        let tasks = commands.iter().find(|c| c.id == "panel-tasks").unwrap();
        assert!(tasks.matches_phrase("add todo"));
        assert_eq!(tasks.params["add_todo"]["type"], "object");
    }

    #[test]
    fn build_is_byte_identical_across_runs() {
        let panels = [
            VisiblePanel::new("panel-e", "Panel E"),
            VisiblePanel::new("badge-alerts", "Alerts"),
        ];
        let manifests = [manifest("panel-tasks", "Tasks", MANIFEST_VERSION)];
        let first = serde_json::to_string(&build(&core_commands(), &panels, &manifests)).unwrap();
        let second = serde_json::to_string(&build(&core_commands(), &panels, &manifests)).unwrap();
        assert_eq!(first, second);
    }
}
