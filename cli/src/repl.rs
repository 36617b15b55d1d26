//! Line protocol for the REPL.
//!
//! Plain lines are chat input. Lines starting with `:` drive the simulated
//! host UI:
//!
//! ```text
//! :ui Widget D=Alpha|Beta, Quick Notes    visible widgets (items after '=')
//! :focus Widget D                         focus a visible widget
//! :unfocus                                release focus
//! :options D|E                            show chat options as the host
//! :state                                  dump session state as JSON
//! :help / :quit
//! ```

use waypoint_engine::context::{UiSnapshot, WidgetSnapshot};
use waypoint_engine::types::{Action, Candidate, WidgetId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Chat(String),
    Ui(Vec<WidgetSpec>),
    Focus(String),
    Unfocus,
    Options(Vec<String>),
    State,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSpec {
    pub title: String,
    pub items: Vec<String>,
}

pub const HELP: &str = "\
Type a message, or one of:
  :ui <title>[=item|item], ...   set visible widgets
  :focus <title>                 focus a visible widget
  :unfocus                       release focus
  :options a|b|c                 show chat options
  :state                         print session state
  :quit";

fn split_list(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[must_use]
pub fn parse(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Empty;
    }
    let Some(meta) = line.strip_prefix(':') else {
        return Line::Chat(line.to_string());
    };
    let (command, rest) = meta.split_once(' ').unwrap_or((meta, ""));
    let rest = rest.trim();
    match command {
        "ui" => Line::Ui(
            split_list(rest, ',')
                .into_iter()
                .map(|spec| match spec.split_once('=') {
                    Some((title, items)) => WidgetSpec {
                        title: title.trim().to_string(),
                        items: split_list(items, '|'),
                    },
                    None => WidgetSpec {
                        title: spec,
                        items: Vec::new(),
                    },
                })
                .collect(),
        ),
        "focus" if !rest.is_empty() => Line::Focus(rest.to_string()),
        "unfocus" => Line::Unfocus,
        "options" => Line::Options(split_list(rest, '|')),
        "state" => Line::State,
        "help" | "h" => Line::Help,
        "quit" | "q" | "exit" => Line::Quit,
        other => Line::Unknown(other.to_string()),
    }
}

/// "Widget D" → "widget-d".
#[must_use]
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

#[must_use]
pub fn candidate(label: &str) -> Candidate {
    let id = slug(label);
    Candidate::new(id.clone(), label, Action::open_panel(format!("panel-{id}"), label))
}

/// Simulated host screen, edited by meta commands.
#[derive(Debug, Clone, Default)]
pub struct Screen {
    pub snapshot: UiSnapshot,
}

impl Screen {
    pub fn set_widgets(&mut self, specs: &[WidgetSpec]) {
        self.snapshot.widgets = specs
            .iter()
            .map(|spec| {
                let id = format!("w-{}", slug(&spec.title));
                WidgetSnapshot::new(id, spec.title.clone(), "list")
                    .with_items(spec.items.iter().map(|item| candidate(item)).collect())
            })
            .collect();
        if let Some(focused) = &self.snapshot.focused_widget
            && !self.snapshot.widgets.iter().any(|w| &w.id == focused)
        {
            self.snapshot.focused_widget = None;
        }
    }

    /// Focus the visible widget titled `title`; returns its id and title.
    pub fn focus(&mut self, title: &str) -> Option<(WidgetId, String)> {
        let wanted = title.to_lowercase();
        let widget = self
            .snapshot
            .widgets
            .iter()
            .find(|w| w.title.to_lowercase() == wanted)?;
        let found = (widget.id.clone(), widget.title.clone());
        self.snapshot.focused_widget = Some(found.0.clone());
        Some(found)
    }

    pub fn unfocus(&mut self) {
        self.snapshot.focused_widget = None;
    }
}
