//! Ordinal / positional selection.
//!
//! Recognizes a closed set of shapes: `2`, `#2`, `2nd`, `second`, `two`,
//! `option 2`, `the second one`, `last`, and single letters when the options
//! were shown letter-tagged. The whole input must be consumed; anything else
//! is [`OrdinalMatch::NoMatch`]. There is no fuzzy guessing here.

use crate::normalize::fold;

const LEAD: &[&str] = &[
    "pick", "select", "choose", "take", "the", "option", "number", "choice", "item",
];
const TRAIL: &[&str] = &["one", "option", "choice", "item", "please"];

const ORDINAL_WORDS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];
const CARDINAL_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

/// A position named by the user, before it is checked against a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// 1-based.
    Nth(usize),
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdinalMatch {
    /// 0-based index into the candidate list.
    Index(usize),
    /// Ordinal-shaped, but past the end of the list (1-based request).
    OutOfRange { requested: usize },
    NoMatch,
}

fn word_index(words: &[&str], token: &str) -> Option<usize> {
    words.iter().position(|w| *w == token).map(|i| i + 1)
}

fn numeric(token: &str) -> Option<usize> {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token);
    digits.parse::<usize>().ok().filter(|n| *n > 0)
}

fn letter(token: &str) -> Option<usize> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'a'..='j'), None) => Some((c as usize) - ('a' as usize) + 1),
        _ => None,
    }
}

/// Parse the input as a position, if it has one of the recognized shapes.
#[must_use]
pub fn parse_position(input: &str, letter_tagged: bool) -> Option<Position> {
    let folded = fold(input);
    let mut tokens: Vec<&str> = folded.split(' ').filter(|t| !t.is_empty()).collect();

    while tokens.len() > 1 && LEAD.contains(&tokens[0]) {
        tokens.remove(0);
    }
    while tokens.len() > 1 && tokens.last().is_some_and(|t| TRAIL.contains(t)) {
        tokens.pop();
    }

    let [token] = tokens.as_slice() else {
        return None;
    };

    if *token == "last" {
        return Some(Position::Last);
    }
    if let Some(n) = numeric(token)
        .or_else(|| word_index(ORDINAL_WORDS, token))
        .or_else(|| word_index(CARDINAL_WORDS, token))
    {
        return Some(Position::Nth(n));
    }
    if letter_tagged {
        return letter(token).map(Position::Nth);
    }
    None
}

#[must_use]
pub fn match_ordinal(input: &str, count: usize, letter_tagged: bool) -> OrdinalMatch {
    match parse_position(input, letter_tagged) {
        None => OrdinalMatch::NoMatch,
        Some(Position::Last) if count > 0 => OrdinalMatch::Index(count - 1),
        Some(Position::Last) => OrdinalMatch::OutOfRange { requested: 1 },
        Some(Position::Nth(n)) if n <= count => OrdinalMatch::Index(n - 1),
        Some(Position::Nth(n)) => OrdinalMatch::OutOfRange { requested: n },
    }
}

#[must_use]
pub fn is_ordinal(input: &str, letter_tagged: bool) -> bool {
    parse_position(input, letter_tagged).is_some()
}
