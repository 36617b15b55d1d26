//! Small pure text helpers used when rendering replies.

/// Truncate `s` and append `suffix` if it exceeds `threshold` characters.
fn truncate_core(s: &str, threshold: usize, take: usize, suffix: &str) -> String {
    if s.chars().count() <= threshold {
        return s.to_string();
    }
    let head: String = s.chars().take(take).collect();
    format!("{head}{suffix}")
}

/// Truncate a string to a maximum length, adding `...` if needed.
///
/// - Trims surrounding whitespace before truncating.
/// - Uses `char` count (not bytes) to avoid splitting Unicode scalar values.
/// - Enforces a minimum `max` of 3 so the ellipsis fits.
#[must_use]
pub fn truncate_with_ellipsis(raw: &str, max: usize) -> String {
    let max = max.max(3);
    let take = max.saturating_sub(3);
    truncate_core(raw.trim(), max, take, "...")
}

/// Join labels the way a person would say them: `D`, `D and E`,
/// `D, E, and F`.
#[must_use]
pub fn join_labels<S: AsRef<str>>(labels: &[S], conjunction: &str) -> String {
    match labels {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} {conjunction} {}", first.as_ref(), second.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{}, {conjunction} {}", head.join(", "), last.as_ref())
        }
    }
}

/// Render a numbered option list, one option per line.
#[must_use]
pub fn numbered_list<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .enumerate()
        .map(|(idx, label)| format!("{}. {}", idx + 1, label.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{join_labels, numbered_list, truncate_with_ellipsis};

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_min_length_is_three() {
        assert_eq!(truncate_with_ellipsis("hello", 1), "...");
    }

    #[test]
    fn join_two_labels() {
        assert_eq!(join_labels(&["D", "E"], "and"), "D and E");
    }

    #[test]
    fn join_three_labels_uses_serial_comma() {
        assert_eq!(join_labels(&["D", "E", "F"], "or"), "D, E, or F");
    }

    #[test]
    fn join_empty_and_single() {
        let empty: [&str; 0] = [];
        assert_eq!(join_labels(&empty, "and"), "");
        assert_eq!(join_labels(&["D"], "and"), "D");
    }

    #[test]
    fn numbered_list_is_one_based() {
        assert_eq!(numbered_list(&["Alpha", "Beta"]), "1. Alpha\n2. Beta");
    }
}
