//! Typo-tolerant matching against the vocabulary.
//!
//! `score = 1 - lev / max_len + prefix_bonus`, capped at 1.0, where
//! `prefix_bonus = 0.05 * min(common_prefix, 4) / 4`. Both sides are
//! [`normalize`]d first. The score is deterministic and, for fixed lengths,
//! monotonic in edit distance.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::normalize::{fold, normalize};
use crate::vocabulary::CommandDef;
use waypoint_config::{Confidence, Thresholds};
use waypoint_types::Candidate;

const PREFIX_BONUS: f64 = 0.05;
const PREFIX_CAP: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyMatch {
    /// Index into the vocabulary slice that was searched.
    pub command_index: usize,
    pub command_id: String,
    pub label: String,
    /// Phrase that produced the best score.
    pub phrase: String,
    pub score: f64,
    #[serde(skip)]
    pub confidence: Confidence,
}

/// Similarity of two already-normalized strings.
#[must_use]
pub fn score(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    let distance = strsim::levenshtein(a, b);
    let base = 1.0 - distance as f64 / max_len as f64;
    let prefix = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count()
        .min(PREFIX_CAP);
    let bonus = PREFIX_BONUS * prefix as f64 / PREFIX_CAP as f64;
    (base + bonus).min(1.0)
}

/// Case-folded form used for rejection bookkeeping.
#[must_use]
pub fn rejection_key(label: &str) -> String {
    fold(label)
}

fn sort_matches(matches: &mut [FuzzyMatch]) {
    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.command_index.cmp(&b.command_index))
    });
}

/// Matches at or above `floor`, best first, one per command. Commands whose
/// label is in `rejected` are removed before scoring.
#[must_use]
pub fn fuzzy_match_with_floor(
    input: &str,
    vocabulary: &[CommandDef],
    rejected: &BTreeSet<String>,
    thresholds: &Thresholds,
    floor: f64,
) -> Vec<FuzzyMatch> {
    let query = normalize(input);
    if query.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<FuzzyMatch> = vocabulary
        .iter()
        .enumerate()
        .filter(|(_, command)| !rejected.contains(&rejection_key(&command.label)))
        .filter_map(|(index, command)| {
            let label = normalize(&command.label);
            command
                .phrases
                .iter()
                .chain(std::iter::once(&label))
                .map(|phrase| (phrase, score(&query, phrase)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .filter(|(_, s)| *s >= floor)
                .map(|(phrase, s)| FuzzyMatch {
                    command_index: index,
                    command_id: command.id.clone(),
                    label: command.label.clone(),
                    phrase: phrase.clone(),
                    score: s,
                    confidence: thresholds.classify(s),
                })
        })
        .collect();

    sort_matches(&mut matches);
    matches
}

#[must_use]
pub fn fuzzy_match(
    input: &str,
    vocabulary: &[CommandDef],
    rejected: &BTreeSet<String>,
    thresholds: &Thresholds,
) -> Vec<FuzzyMatch> {
    fuzzy_match_with_floor(input, vocabulary, rejected, thresholds, thresholds.floor)
}

/// The best match if it is high-confidence and clear of the runner-up by
/// at least the ambiguity margin.
#[must_use]
pub fn unique_high<'a>(
    matches: &'a [FuzzyMatch],
    thresholds: &Thresholds,
) -> Option<&'a FuzzyMatch> {
    let best = matches.first()?;
    if best.confidence != Confidence::High {
        return None;
    }
    let clear = matches
        .get(1)
        .is_none_or(|second| best.score - second.score >= thresholds.ambiguity_margin);
    clear.then_some(best)
}

/// Score `input` against candidate labels (and sublabels). Returns
/// `(index, score)` pairs at or above `floor`, best first.
#[must_use]
pub fn rank_candidates(input: &str, candidates: &[Candidate], floor: f64) -> Vec<(usize, f64)> {
    let query = normalize(input);
    if query.is_empty() {
        return Vec::new();
    }
    let mut ranked: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let label = score(&query, &normalize(&candidate.label));
            let sub = candidate
                .sublabel
                .as_deref()
                .map_or(0.0, |s| score(&query, &normalize(s)));
            (index, label.max(sub))
        })
        .filter(|(_, s)| *s >= floor)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Candidates whose label contains every word of `input`.
#[must_use]
pub fn containing_candidates(input: &str, candidates: &[Candidate]) -> Vec<usize> {
    let query = normalize(input);
    let words: Vec<&str> = query.split(' ').filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return Vec::new();
    }
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            let label = normalize(&c.label);
            let label_words: Vec<&str> = label.split(' ').collect();
            words.iter().all(|w| label_words.contains(w))
        })
        .map(|(i, _)| i)
        .collect()
}
