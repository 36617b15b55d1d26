//! Closed conversational phrase sets.
//!
//! All checks run on [`fold`]ed input, so punctuation and case never matter.

use crate::normalize::fold;

const STOP: &[&str] = &[
    "stop",
    "cancel",
    "skip",
    "never mind",
    "nevermind",
    "nvm",
    "forget it",
    "stop that",
    "cancel that",
    "skip it",
    "skip this",
    "quit",
];

const RESUME: &[&str] = &[
    "back to options",
    "back to the options",
    "go back",
    "go back to options",
    "go back to the options",
    "show options again",
    "show the options again",
    "show me the options again",
    "options again",
];

const REJECT_EXACT: &[&str] = &[
    "no",
    "nope",
    "nah",
    "no thanks",
    "not that",
    "not that one",
    "not those",
    "neither",
    "none of those",
    "none of them",
    "wrong",
    "thats not it",
    "thats wrong",
];

const REJECT_PREFIX: &str = "no";

const AFFIRM: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "yup",
    "sure",
    "ok",
    "okay",
    "correct",
    "right",
    "that one",
    "yes that one",
    "yes please",
    "do it",
    "go ahead",
];

const QUESTION_OPENERS: &[&str] = &[
    "what", "where", "which", "who", "when", "why", "how", "is", "are", "do", "does", "did",
    "can", "could", "was", "were", "have", "has",
];

fn in_set(set: &[&str], input: &str) -> bool {
    let folded = fold(input);
    set.contains(&folded.as_str())
}

#[must_use]
pub fn is_stop(input: &str) -> bool {
    in_set(STOP, input)
}

#[must_use]
pub fn is_resume(input: &str) -> bool {
    in_set(RESUME, input)
}

#[must_use]
pub fn is_affirmation(input: &str) -> bool {
    in_set(AFFIRM, input)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    None,
    /// The whole input is a rejection phrase.
    Exact,
    /// Starts with the rejection token; `remainder` is the rest, folded.
    Prefixed { remainder: String },
}

#[must_use]
pub fn detect_rejection(input: &str) -> Rejection {
    let folded = fold(input);
    if REJECT_EXACT.contains(&folded.as_str()) {
        return Rejection::Exact;
    }
    match folded.split_once(' ') {
        Some((first, rest)) if first == REJECT_PREFIX => Rejection::Prefixed {
            remainder: rest.to_string(),
        },
        _ => Rejection::None,
    }
}

/// Input with a leading rejection token removed, folded.
#[must_use]
pub fn strip_rejection_prefix(input: &str) -> String {
    match detect_rejection(input) {
        Rejection::Prefixed { remainder } => remainder,
        _ => fold(input),
    }
}

#[must_use]
pub fn looks_like_question(input: &str) -> bool {
    if input.trim_end().ends_with('?') {
        return true;
    }
    let folded = fold(input);
    folded
        .split(' ')
        .next()
        .is_some_and(|first| QUESTION_OPENERS.contains(&first))
}
