use std::collections::BTreeSet;

use waypoint_core::command::is_explicit_command;
use waypoint_core::fuzzy::{FuzzyMatch, fuzzy_match, unique_high};
use waypoint_core::normalize::{fold, singularize};
use waypoint_core::phrases::{looks_like_question, strip_rejection_prefix};
use waypoint_core::{CommandDef, SessionEffect};
use waypoint_config::Confidence;
use waypoint_types::text::join_labels;
use waypoint_types::{Candidate, EntityType, HistoryEntry, HistoryKind, Resolution, TargetType};

use crate::decision::{ClarifyReason, Decision};
use crate::tier::{Tier, TierContext, TierOutcome};
use crate::tiers::command_decision;
use crate::tiers::context_qa::parse_query;

const EXISTENCE_LEADS: &[&str] = &[
    "do i have",
    "do i still have",
    "have i got",
    "is there",
    "did i create",
    "do we have",
];
const ARTICLES: &[&str] = &["a", "an", "any", "the", "my"];
const NAMING: &[&str] = &["called", "named", "titled"];
const MAX_SUGGESTIONS: usize = 3;

/// Reply when every plausible match was already rejected.
pub const GENERIC_FALLBACK: &str =
    "I'm not sure what you're looking for. Try naming a panel, like \"Recent Entries\" or \"Quick Notes\".";

/// Grounding-set fallback: existence lookups, then typo-tolerant matching
/// against the vocabulary with rejected suggestions filtered out.
pub struct GroundingTier;

#[derive(Debug, PartialEq, Eq)]
struct ExistenceQuery {
    entity: EntityType,
    name: String,
}

fn parse_existence(input: &str) -> Option<ExistenceQuery> {
    let folded = fold(input);
    let rest = EXISTENCE_LEADS
        .iter()
        .find_map(|lead| folded.strip_prefix(lead)?.strip_prefix(' '))?;
    let mut words: Vec<&str> = rest.split(' ').collect();
    if words.first().is_some_and(|w| ARTICLES.contains(w)) {
        words.remove(0);
    }
    let (noun, tail) = words.split_first()?;
    let entity = EntityType::from_noun(&singularize(noun))?;
    let tail = match tail.split_first() {
        Some((first, rest)) if NAMING.contains(first) => rest,
        _ => tail,
    };
    let name = tail.join(" ");
    (!name.is_empty()).then_some(ExistenceQuery { entity, name })
}

/// Existence answered from live UI or still-fresh chat context.
fn answer_from_context(query: &ExistenceQuery, cx: &TierContext<'_>) -> Option<String> {
    if let Some(widget) = cx
        .ui
        .visible_widgets
        .iter()
        .find(|w| fold(&w.title) == query.name)
    {
        return Some(format!("Yes, {} is open on your screen right now.", widget.title));
    }
    if let Some(label) = cx
        .chat
        .fresh_options()
        .and_then(|options| options.iter().find(|c| fold(&c.label) == query.name))
        .map(|c| c.label.clone())
    {
        return Some(format!("Yes, {label} is in the list I just showed you."));
    }
    cx.chat
        .fresh_list_preview()
        .and_then(|preview| preview.items.iter().find(|item| fold(item) == query.name))
        .map(|item| format!("Yes, {item} is in the list I just showed you."))
}

fn target_for(entity: EntityType) -> TargetType {
    match entity {
        EntityType::Widget => TargetType::Widget,
        EntityType::Workspace => TargetType::Workspace,
        EntityType::Entry => TargetType::Entry,
        EntityType::Note => TargetType::Note,
        EntityType::Panel => TargetType::Panel,
    }
}

fn existence(query: ExistenceQuery, cx: &TierContext<'_>) -> Decision {
    if let Some(answer) = answer_from_context(&query, cx) {
        return Decision::from_context(answer);
    }
    let entry = HistoryEntry {
        kind: HistoryKind::Lookup,
        target_type: target_for(query.entity),
        target_name: query.name.clone(),
        target_id: None,
        timestamp: cx.now,
    };
    let reply = format!("Let me check your {}s for \"{}\".", query.entity, query.name);
    Decision::answer(
        Resolution::RetrieveFromApp {
            entity_type: query.entity,
            name: query.name,
            scope: cx.user.clone(),
        },
        reply,
    )
    .with_effect(SessionEffect::RecordRequest(entry))
}

fn as_candidates(matches: &[FuzzyMatch], vocabulary: &[CommandDef]) -> Vec<Candidate> {
    matches
        .iter()
        .filter_map(|m| vocabulary.get(m.command_index))
        .map(|command| {
            Candidate::new(
                command.id.clone(),
                command.label.clone(),
                command.action.clone(),
            )
        })
        .collect()
}

impl Tier for GroundingTier {
    fn name(&self) -> &'static str {
        "grounding"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        if let Some(query) = parse_existence(cx.input) {
            return TierOutcome::Handled(existence(query, cx));
        }

        let text = strip_rejection_prefix(cx.input);
        if looks_like_question(cx.input)
            && (parse_query(cx.input).is_some() || !is_explicit_command(&text, cx.vocabulary))
        {
            return TierOutcome::PassThrough;
        }

        let thresholds = &cx.tuning.thresholds;
        let matches = fuzzy_match(&text, cx.vocabulary, cx.state.rejected(), thresholds);

        if let Some(best) = unique_high(&matches, thresholds)
            && let Some(command) = cx.vocabulary.get(best.command_index)
        {
            tracing::debug!(
                turn = %cx.turn,
                command = %command.id,
                score = best.score,
                "Unique high-confidence match"
            );
            return TierOutcome::Handled(command_decision(command, cx.now));
        }

        let Some(best) = matches.first() else {
            if cx.state.rejected().is_empty() {
                return TierOutcome::PassThrough;
            }
            // Everything plausible was filtered out by rejection.
            let unfiltered = fuzzy_match(&text, cx.vocabulary, &BTreeSet::new(), thresholds);
            if unfiltered.is_empty() {
                return TierOutcome::PassThrough;
            }
            return TierOutcome::Handled(Decision::unrecognized(GENERIC_FALLBACK));
        };

        if best.confidence < Confidence::Medium {
            return TierOutcome::PassThrough;
        }

        let close: Vec<FuzzyMatch> = matches
            .iter()
            .filter(|m| {
                m.confidence >= Confidence::Medium
                    && best.score - m.score < thresholds.ambiguity_margin
            })
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect();
        let names: Vec<&str> = close.iter().map(|m| m.label.as_str()).collect();
        let reply = format!("Did you mean {}?", join_labels(&names, "or"));
        tracing::debug!(
            turn = %cx.turn,
            score = best.score,
            suggestions = close.len(),
            "Suggesting"
        );

        TierOutcome::Handled(
            Decision::clarify(ClarifyReason::Suggestion, reply).with_effect(
                SessionEffect::SetLastSuggestion {
                    candidates: as_candidates(&close, cx.vocabulary),
                    input: cx.input.to_string(),
                },
            ),
        )
    }
}
