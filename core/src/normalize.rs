//! The one fixed normalization every matcher agrees on.
//!
//! [`fold`] is the light form: NFKC, lowercase, punctuation to spaces,
//! collapsed whitespace. [`normalize`] additionally drops filler words and
//! singularizes trailing plurals; it is what fuzzy and phrase matching
//! compare. Casing uses `char::to_lowercase`, which is locale-independent.

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

const FILLER: &[&str] = &[
    "please", "pls", "plz", "kindly", "the", "a", "an", "can", "could", "would", "you", "me",
    "for", "just", "um", "uh", "hey", "ok", "okay", "actually", "so", "well",
];

#[must_use]
pub fn fold(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for ch in input.nfkc().flat_map(char::to_lowercase) {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Words of the folded input.
#[must_use]
pub fn tokens(input: &str) -> Vec<String> {
    fold(input).unicode_words().map(str::to_string).collect()
}

#[must_use]
pub fn is_filler(word: &str) -> bool {
    FILLER.contains(&word)
}

#[must_use]
pub fn singularize(word: &str) -> String {
    let len = word.chars().count();
    if len <= 3 || !word.is_ascii() {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies")
        && len > 4
    {
        return format!("{stem}y");
    }
    if let Some(stem) = word.strip_suffix("sses") {
        return format!("{stem}ss");
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

#[must_use]
pub fn normalize(input: &str) -> String {
    tokens(input)
        .iter()
        .filter(|word| !is_filler(word))
        .map(|word| singularize(word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_punctuation_and_case() {
        assert_eq!(fold("  Is F in the LIST?! "), "is f in the list");
        assert_eq!(fold("what's up"), "whats up");
        assert_eq!(fold("no, open panel e"), "no open panel e");
    }

    #[test]
    fn fold_applies_nfkc() {
        assert_eq!(fold("ｏｐｅｎ"), "open");
    }

    #[test]
    fn normalize_drops_filler_and_plurals() {
        assert_eq!(normalize("Please show me the widgets"), "show widget");
        assert_eq!(normalize("vuew demo widgets"), "vuew demo widget");
        assert_eq!(normalize("recent entries"), "recent entry");
    }

    #[test]
    fn singularize_leaves_short_and_ss_words() {
        assert_eq!(singularize("is"), "is");
        assert_eq!(singularize("this"), "this");
        assert_eq!(singularize("class"), "class");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("classes"), "class");
    }

    #[test]
    fn normalize_is_deterministic() {
        let a = normalize("Open My Quick-Notes");
        let b = normalize("Open My Quick-Notes");
        assert_eq!(a, b);
        assert_eq!(a, "open my quick note");
    }
}
