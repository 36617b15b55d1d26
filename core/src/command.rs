//! Explicit-command detection.
//!
//! An input is an explicit command when it has an action verb followed by a
//! target: either a known noun category (panel, widget, workspace...) or a
//! word that names something in the vocabulary. Explicit commands are allowed
//! to interrupt selection and clarification state.

use std::collections::BTreeSet;

use crate::normalize::{is_filler, normalize};
use crate::vocabulary::CommandDef;

const VERBS: &[&str] = &[
    "open", "show", "list", "view", "go", "goto", "navigate", "take", "create", "new", "rename",
    "delete", "remove", "close", "find", "search", "display", "switch", "bring",
];

const TARGET_NOUNS: &[&str] = &[
    "panel", "widget", "drawer", "workspace", "entry", "note", "dashboard", "home", "setting",
    "badge", "page",
];

/// Words that never name a target on their own.
const NOT_TARGETS: &[&str] = &["my", "to", "it", "that", "this", "one", "back", "again", "up"];

fn vocabulary_words(vocabulary: &[CommandDef]) -> BTreeSet<&str> {
    vocabulary
        .iter()
        .flat_map(|c| c.phrases.iter())
        .flat_map(|p| p.split(' '))
        .filter(|w| w.len() > 1 && !VERBS.contains(w) && !NOT_TARGETS.contains(w) && !is_filler(w))
        .collect()
}

#[must_use]
pub fn is_verb(word: &str) -> bool {
    VERBS.contains(&word)
}

#[must_use]
pub fn is_explicit_command(input: &str, vocabulary: &[CommandDef]) -> bool {
    let normalized = normalize(input);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    let Some(verb_at) = words.iter().position(|w| is_verb(w)) else {
        return false;
    };

    let known = vocabulary_words(vocabulary);
    words[verb_at + 1..]
        .iter()
        .filter(|w| !is_verb(w) && !NOT_TARGETS.contains(w))
        .any(|w| TARGET_NOUNS.contains(w) || known.contains(w))
}
