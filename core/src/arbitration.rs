//! Selection Arbitration / Latch Resolver.
//!
//! Decides, for selection-like input, which executable context a selection
//! applies to. Priority is fixed:
//!
//! 1. scope cue ("from chat", "in widget d"),
//! 2. explicit command (passes through, latch never swallows it),
//! 3. latched widget,
//! 4. chat options.
//!
//! Arbitration is pure: it reads session state and the live UI and returns
//! an [`Arbitration`]. Effects are chosen by the caller.

use std::time::SystemTime;

use crate::command::is_explicit_command;
use crate::fuzzy::{containing_candidates, rank_candidates};
use crate::normalize::{fold, normalize};
use crate::ordinal::{OrdinalMatch, Position, match_ordinal, parse_position};
use crate::phrases::{looks_like_question, strip_rejection_prefix};
use crate::scope::{ScopeCue, detect_scope_cue};
use crate::session::SessionState;
use crate::vocabulary::CommandDef;
use waypoint_config::{Thresholds, Tuning};
use waypoint_types::{Candidate, OptionSetId, UiContext, WidgetId, WidgetSummary};

/// Words that make otherwise unmatched input read as a selection attempt.
const SELECTION_WORDS: &[&str] = &[
    "one", "that", "this", "option", "choice", "item", "pick", "select", "choose",
];

/// Bare answers to "chat or widget?" that name the chat side.
const CHAT_ANSWERS: &[&str] = &[
    "chat",
    "the chat",
    "chat options",
    "the chat options",
    "options",
    "the options",
    "the chat one",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSource {
    Chat(OptionSetId),
    Widget { id: WidgetId, title: String },
}

impl SelectionSource {
    #[must_use]
    pub fn is_widget(&self) -> bool {
        matches!(self, Self::Widget { .. })
    }

    fn widget(summary: &WidgetSummary) -> Self {
        Self::Widget {
            id: summary.id.clone(),
            title: summary.title.clone(),
        }
    }
}

/// A context that was named but has nothing selectable any more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleTarget {
    ChatOptions,
    Widget { id: WidgetId, title: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arbitration {
    /// Not a selection; let later tiers have it.
    PassThrough,
    Select {
        source: SelectionSource,
        candidate: Candidate,
        index: usize,
    },
    /// Selection-like, but no unique deterministic winner in the bounded set.
    Ambiguous {
        source: SelectionSource,
        candidates: Vec<Candidate>,
        /// Input with any scope cue removed.
        remainder: String,
    },
    OutOfRange {
        source: SelectionSource,
        requested: usize,
        candidates: Vec<Candidate>,
    },
    /// A pure ordinal valid in both live chat options and the focused widget.
    WhichSource {
        chat: Vec<Candidate>,
        widget: SelectionSource,
        position: usize,
    },
    Stale(StaleTarget),
}

enum Matched {
    Index(usize),
    OutOfRange(usize),
    Ambiguous,
    None,
}

struct Target<'a> {
    source: SelectionSource,
    candidates: &'a [Candidate],
    letter_tagged: bool,
}

impl Target<'_> {
    fn into_arbitration(self, matched: Matched, remainder: &str) -> Arbitration {
        match matched {
            Matched::Index(index) => match self.candidates.get(index) {
                Some(candidate) => Arbitration::Select {
                    source: self.source,
                    candidate: candidate.clone(),
                    index,
                },
                None => Arbitration::PassThrough,
            },
            Matched::OutOfRange(requested) => Arbitration::OutOfRange {
                source: self.source,
                requested,
                candidates: self.candidates.to_vec(),
            },
            Matched::Ambiguous => Arbitration::Ambiguous {
                source: self.source,
                candidates: self.candidates.to_vec(),
                remainder: remainder.to_string(),
            },
            Matched::None => Arbitration::PassThrough,
        }
    }
}

fn position_index(position: Position, count: usize) -> Matched {
    match position {
        Position::Last if count > 0 => Matched::Index(count - 1),
        Position::Nth(n) if (1..=count).contains(&n) => Matched::Index(n - 1),
        Position::Nth(n) => Matched::OutOfRange(n),
        Position::Last => Matched::OutOfRange(1),
    }
}

fn resolve_in(text: &str, target: &Target<'_>, thresholds: &Thresholds) -> Matched {
    let candidates = target.candidates;
    match match_ordinal(text, candidates.len(), target.letter_tagged) {
        OrdinalMatch::Index(index) => return Matched::Index(index),
        OrdinalMatch::OutOfRange { requested } => return Matched::OutOfRange(requested),
        OrdinalMatch::NoMatch => {}
    }

    let normalized = normalize(text);
    if normalized.is_empty() {
        return Matched::None;
    }

    let exact: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            normalize(&c.label) == normalized
                || c.sublabel.as_deref().is_some_and(|s| normalize(s) == normalized)
        })
        .map(|(i, _)| i)
        .collect();
    if let [only] = exact.as_slice() {
        return Matched::Index(*only);
    }
    if exact.len() > 1 {
        return Matched::Ambiguous;
    }

    let ranked = rank_candidates(text, candidates, thresholds.relaxed_floor);
    if let Some(&(best, best_score)) = ranked.first()
        && best_score >= thresholds.high
        && ranked
            .get(1)
            .is_none_or(|&(_, second)| best_score - second >= thresholds.ambiguity_margin)
    {
        return Matched::Index(best);
    }

    let selection_worded = normalized
        .split(' ')
        .any(|w| SELECTION_WORDS.contains(&w));
    if !ranked.is_empty() || !containing_candidates(text, candidates).is_empty() || selection_worded
    {
        Matched::Ambiguous
    } else {
        Matched::None
    }
}

/// Resolve against a context the user named explicitly. An empty remainder
/// still counts as a selection attempt against that context.
fn resolve_named(
    remainder: &str,
    target: Target<'_>,
    pending_position: Option<usize>,
    thresholds: &Thresholds,
) -> Arbitration {
    let mut matched = resolve_in(remainder, &target, thresholds);
    if matches!(matched, Matched::None | Matched::Ambiguous)
        && parse_position(remainder, target.letter_tagged).is_none()
        && let Some(position) = pending_position
    {
        matched = position_index(Position::Nth(position), target.candidates.len());
    }
    if matches!(matched, Matched::None) {
        matched = Matched::Ambiguous;
    }
    target.into_arbitration(matched, remainder)
}

/// Recognize a bare answer to a which-source clarifier as a scope cue.
fn answer_as_cue(folded: &str, ui: &UiContext) -> ScopeCue {
    if CHAT_ANSWERS.contains(&folded) {
        return ScopeCue::Chat {
            remainder: String::new(),
        };
    }
    ui.visible_widgets
        .iter()
        .find(|w| {
            let title = fold(&w.title);
            folded == title || folded == format!("the {title}")
        })
        .map_or(ScopeCue::None, |w| ScopeCue::Widget {
            id: w.id.clone(),
            remainder: String::new(),
        })
}

/// Decide which executable context, if any, `input` selects from.
#[must_use]
pub fn arbitrate(
    input: &str,
    state: &SessionState,
    ui: &UiContext,
    vocabulary: &[CommandDef],
    tuning: &Tuning,
    now: SystemTime,
) -> Arbitration {
    let thresholds = &tuning.thresholds;
    let decay = &tuning.decay;
    let text = strip_rejection_prefix(input);
    let pending_position = state.clarification().and_then(|c| c.pending_position);

    let mut cue = detect_scope_cue(&text, ui);
    if !cue.is_some() && pending_position.is_some() {
        cue = answer_as_cue(&text, ui);
    }

    let chat = state.live_chat_options(now, decay.pending_options_grace);
    let latched = state
        .latch()
        .and_then(|latch| ui.widget(&latch.widget_id))
        .filter(|w| !w.items.is_empty());
    let focused = ui
        .focused_selectable_widget()
        .filter(|w| latched.is_none_or(|l| l.id != w.id));

    let ordinal_shaped = parse_position(&text, chat.is_some_and(|c| c.letter_tagged)).is_some();

    // 1. Not selection-shaped and nothing to select from.
    if !cue.is_some()
        && chat.is_none()
        && latched.is_none()
        && !(ordinal_shaped && focused.is_some())
    {
        return Arbitration::PassThrough;
    }

    // 2. Scope cue beats everything.
    match &cue {
        ScopeCue::Chat { remainder } => {
            let options = chat.or_else(|| state.last_options(now, decay.last_options_retention));
            let Some(options) = options else {
                return Arbitration::Stale(StaleTarget::ChatOptions);
            };
            let target = Target {
                source: SelectionSource::Chat(options.set_id),
                candidates: &options.candidates,
                letter_tagged: options.letter_tagged,
            };
            return resolve_named(remainder, target, pending_position, thresholds);
        }
        ScopeCue::Widget { id, remainder } => {
            let Some(widget) = ui.widget(id).filter(|w| !w.items.is_empty()) else {
                let title = ui.widget(id).map(|w| w.title.clone()).unwrap_or_default();
                return Arbitration::Stale(StaleTarget::Widget {
                    id: id.clone(),
                    title,
                });
            };
            let target = Target {
                source: SelectionSource::widget(widget),
                candidates: &widget.items,
                letter_tagged: false,
            };
            return resolve_named(remainder, target, pending_position, thresholds);
        }
        ScopeCue::None => {}
    }

    // 3. Explicit commands are never swallowed by a selection context.
    if is_explicit_command(&text, vocabulary) {
        return Arbitration::PassThrough;
    }
    if looks_like_question(input) {
        return Arbitration::PassThrough;
    }

    // 4. Latch default.
    if let Some(widget) = latched {
        let target = Target {
            source: SelectionSource::widget(widget),
            candidates: &widget.items,
            letter_tagged: false,
        };
        let matched = resolve_in(&text, &target, thresholds);
        return target.into_arbitration(matched, &text);
    }

    // Dual-source exception: a pure ordinal that fits both live contexts.
    if let (Some(options), Some(widget)) = (chat, focused)
        && let Some(position) = parse_position(&text, options.letter_tagged)
    {
        let in_chat = position_index(position, options.candidates.len());
        let in_widget = position_index(position, widget.items.len());
        return match (in_chat, in_widget) {
            (Matched::Index(index), Matched::Index(_)) => Arbitration::WhichSource {
                chat: options.candidates.clone(),
                widget: SelectionSource::widget(widget),
                position: index + 1,
            },
            (Matched::OutOfRange(_), Matched::Index(index)) => Target {
                source: SelectionSource::widget(widget),
                candidates: &widget.items,
                letter_tagged: false,
            }
            .into_arbitration(Matched::Index(index), &text),
            (in_chat, _) => Target {
                source: SelectionSource::Chat(options.set_id),
                candidates: &options.candidates,
                letter_tagged: options.letter_tagged,
            }
            .into_arbitration(in_chat, &text),
        };
    }

    // 5. Chat default.
    if let Some(options) = chat {
        let target = Target {
            source: SelectionSource::Chat(options.set_id),
            candidates: &options.candidates,
            letter_tagged: options.letter_tagged,
        };
        let matched = resolve_in(&text, &target, thresholds);
        return target.into_arbitration(matched, &text);
    }

    // Only a focused, unlatched widget and a pure ordinal.
    if let Some(widget) = focused {
        let target = Target {
            source: SelectionSource::widget(widget),
            candidates: &widget.items,
            letter_tagged: false,
        };
        let matched = resolve_in(&text, &target, thresholds);
        return target.into_arbitration(matched, &text);
    }

    Arbitration::PassThrough
}
