//! Passive questions about what the conversation and the screen already
//! show. Answers come only from fresh chat context, the live UI and the two
//! history lists; anything decayed gets the stale reply.

use std::collections::BTreeSet;

use waypoint_core::normalize::{fold, is_filler, normalize, tokens};
use waypoint_types::candidate::labels;
use waypoint_types::text::{join_labels, numbered_list};
use waypoint_types::{BoundedHistory, ContextField, HistoryEntry};

use crate::decision::Decision;
use crate::tier::{Tier, TierContext, TierOutcome};

const MEMBERSHIP_SUFFIXES: &[&str] = &[
    " in the list",
    " in that list",
    " in the options",
    " one of the options",
    " an option",
    " on the list",
];

const OPTION_RECALL: &[&str] = &[
    "what were the options",
    "what were my options",
    "what are the options",
    "what are my options",
    "what options did you show",
    "what options did you give me",
    "which options were there",
];

const LAST_OPENED: &[&str] = &[
    "what did you just open",
    "what did you open",
    "what did you open last",
    "what was the last panel",
    "which panel did you open",
    "what panel did you open",
];

const WHERE_AM_I: &[&str] = &[
    "where am i",
    "where are we",
    "what am i looking at",
    "what screen is this",
    "what page is this",
];

const LAST_ERROR: &[&str] = &[
    "what went wrong",
    "what was the error",
    "what was that error",
    "why did that fail",
    "what failed",
];

const ASKED_LEADS: &[&str] = &["did i ask you to ", "did i ask to ", "have i asked you to "];
const DONE_LEADS: &[&str] = &[
    "did you open ",
    "did you go to ",
    "did you select ",
    "have you opened ",
    "did you already open ",
];
const REQUEST_VERBS: &[&str] = &["open", "show", "go to", "select", "look up", "find", "view"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContextQuery {
    Membership(String),
    OptionRecall,
    LastOpened,
    WhereAmI,
    LastError,
    DidIAsk(String),
    DidYouDo(String),
}

/// Recognize a context question; punctuation and case are ignored.
pub(crate) fn parse_query(input: &str) -> Option<ContextQuery> {
    let folded = fold(input);
    let text = folded.as_str();

    if OPTION_RECALL.contains(&text) {
        return Some(ContextQuery::OptionRecall);
    }
    if LAST_OPENED.contains(&text) {
        return Some(ContextQuery::LastOpened);
    }
    if WHERE_AM_I.contains(&text) {
        return Some(ContextQuery::WhereAmI);
    }
    if LAST_ERROR.contains(&text) {
        return Some(ContextQuery::LastError);
    }
    if let Some(rest) = strip_any(text, ASKED_LEADS) {
        return Some(ContextQuery::DidIAsk(rest.to_string()));
    }
    if let Some(rest) = strip_any(text, DONE_LEADS) {
        return Some(ContextQuery::DidYouDo(rest.to_string()));
    }
    let subject = text.strip_prefix("is ")?;
    MEMBERSHIP_SUFFIXES
        .iter()
        .find_map(|suffix| subject.strip_suffix(suffix))
        .filter(|item| !item.is_empty())
        .map(|item| ContextQuery::Membership(item.to_string()))
}

fn strip_any<'a>(text: &'a str, leads: &[&str]) -> Option<&'a str> {
    leads
        .iter()
        .find_map(|lead| text.strip_prefix(lead))
        .filter(|rest| !rest.is_empty())
}

/// Fresh value, stale marker, or nothing remembered at all.
enum Recall<'a, T> {
    Fresh(&'a T),
    Stale,
    Missing,
}

fn recall<T>(field: Option<&ContextField<T>>) -> Recall<'_, T> {
    match field {
        Some(field) => field.fresh().map_or(Recall::Stale, Recall::Fresh),
        None => Recall::Missing,
    }
}

/// Whole-word match: one side's words are a subset of the other's.
fn same_target(entry: &HistoryEntry, target: &str) -> bool {
    let name = content_words(&entry.target_name);
    let wanted = content_words(target);
    if name.is_empty() || wanted.is_empty() {
        return false;
    }
    wanted.is_subset(&name) || name.is_subset(&wanted)
}

fn content_words(text: &str) -> BTreeSet<String> {
    tokens(text)
        .into_iter()
        .filter(|word| !is_filler(word))
        .collect()
}

/// "open panel e" → "panel e"; bare targets pass unchanged.
fn request_target(rest: &str) -> String {
    let stripped = REQUEST_VERBS
        .iter()
        .find_map(|verb| rest.strip_prefix(verb)?.strip_prefix(' '))
        .unwrap_or(rest);
    normalize(stripped)
}

fn find<'a>(history: &'a BoundedHistory, target: &str) -> Option<&'a HistoryEntry> {
    history.iter().find(|entry| same_target(entry, target))
}

fn membership(item: &str, cx: &TierContext<'_>) -> TierOutcome {
    let wanted = normalize(item);
    match recall(cx.chat.last_options.as_ref()) {
        Recall::Fresh(options) => {
            let reply = options
                .iter()
                .position(|c| normalize(&c.label) == wanted)
                .map_or_else(
                    || format!("No, only {}.", join_labels(&labels(options), "and")),
                    |index| format!("Yes, {} is option {}.", options[index].label, index + 1),
                );
            return TierOutcome::Handled(Decision::from_context(reply));
        }
        Recall::Stale => return TierOutcome::Handled(Decision::stale()),
        Recall::Missing => {}
    }
    match recall(cx.chat.last_list_preview.as_ref()) {
        Recall::Fresh(preview) => {
            let reply = preview
                .items
                .iter()
                .find(|entry| normalize(entry) == wanted)
                .map_or_else(
                    || format!("No, only {}.", join_labels(&preview.items, "and")),
                    |entry| format!("Yes, {entry} is in {}.", preview.title),
                );
            TierOutcome::Handled(Decision::from_context(reply))
        }
        Recall::Stale => TierOutcome::Handled(Decision::stale()),
        Recall::Missing => TierOutcome::PassThrough,
    }
}

fn where_am_i(cx: &TierContext<'_>) -> String {
    let mut reply = format!("You're on the {} view", cx.ui.mode.as_str());
    if let Some(drawer) = &cx.ui.open_drawer {
        reply.push_str(&format!(" with {} open", drawer.title));
    }
    reply.push('.');
    if let Some(item) = cx.ui.active_item() {
        reply.push_str(&format!(" You're looking at {}.", item.title));
    }
    reply
}

pub struct ContextQaTier;

impl Tier for ContextQaTier {
    fn name(&self) -> &'static str {
        "context_qa"
    }

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome {
        let Some(query) = parse_query(cx.input) else {
            return TierOutcome::PassThrough;
        };
        tracing::debug!(turn = %cx.turn, ?query, "Context question");

        let decision = match query {
            ContextQuery::Membership(item) => return membership(&item, cx),
            ContextQuery::OptionRecall => match recall(cx.chat.last_options.as_ref()) {
                Recall::Fresh(options) => Decision::from_context(format!(
                    "The options were:\n{}",
                    numbered_list(&labels(options))
                )),
                Recall::Stale => Decision::stale(),
                Recall::Missing => Decision::from_context("I haven't shown you any options yet."),
            },
            ContextQuery::LastOpened => match recall(cx.chat.last_opened_panel.as_ref()) {
                Recall::Fresh(panel) => {
                    Decision::from_context(format!("I last opened {}.", panel.title))
                }
                Recall::Stale => Decision::stale(),
                Recall::Missing => Decision::from_context("I haven't opened anything yet."),
            },
            ContextQuery::WhereAmI => Decision::from_context(where_am_i(cx)),
            ContextQuery::LastError => match recall(cx.chat.last_error_message.as_ref()) {
                Recall::Fresh(error) => {
                    Decision::from_context(format!("The last error was: {error}"))
                }
                Recall::Stale => Decision::stale(),
                Recall::Missing => Decision::from_context("Nothing has gone wrong recently."),
            },
            ContextQuery::DidIAsk(rest) => {
                let target = request_target(&rest);
                Decision::from_context(find(cx.state.request_history(), &target).map_or_else(
                    || format!("No, you didn't ask me to {rest}."),
                    |entry| {
                        format!(
                            "Yes, you asked me to {} {}.",
                            entry.kind.verb(),
                            entry.target_name
                        )
                    },
                ))
            }
            ContextQuery::DidYouDo(rest) => {
                let target = normalize(&rest);
                Decision::from_context(find(cx.state.action_history(), &target).map_or_else(
                    || format!("No, I haven't done that for {rest}."),
                    |entry| format!("Yes, I {} {}.", entry.kind.past_tense(), entry.target_name),
                ))
            }
        };
        TierOutcome::Handled(decision)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::decision::ReplyKind;
    use crate::tiers::testing::{Fixture, now, option};
    use waypoint_core::SessionEffect;
    use waypoint_types::{Action, HistoryKind, MessageId, PanelRef, Resolution, UiMode};

    fn field<T>(value: T, stale: bool) -> ContextField<T> {
        ContextField {
            value,
            source: MessageId::new(4),
            age: Duration::from_secs(30),
            stale,
        }
    }

    fn with_options(stale: bool) -> Fixture {
        let mut fixture = Fixture::default();
        fixture.chat.last_options = Some(field(vec![option("d", "D"), option("e", "E")], stale));
        fixture
    }

    fn answer(outcome: TierOutcome) -> String {
        match outcome {
            TierOutcome::Handled(Decision {
                resolution: Some(Resolution::AnswerFromContext { answer }),
                ..
            }) => answer,
            other => panic!("expected an answer from context, got {other:?}"),
        }
    }

    #[test]
    fn recognizes_queries() {
        assert_eq!(
            parse_query("Is F in the list?"),
            Some(ContextQuery::Membership("f".to_string()))
        );
        assert_eq!(parse_query("What were the options?"), Some(ContextQuery::OptionRecall));
        assert_eq!(
            parse_query("did I ask you to open panel E?"),
            Some(ContextQuery::DidIAsk("open panel e".to_string()))
        );
        assert_eq!(parse_query("open panel e"), None);
    }

    #[test]
    fn membership_lists_the_real_options() {
        let fixture = with_options(false);
        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("is F in the list?"))),
            "No, only D and E."
        );
        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("is E in the list?"))),
            "Yes, E is option 2."
        );
    }

    #[test]
    fn stale_options_get_stale_reply() {
        let fixture = with_options(true);
        let TierOutcome::Handled(decision) =
            ContextQaTier.evaluate(&fixture.cx("what were the options?"))
        else {
            panic!("stale recall must be handled");
        };
        assert_eq!(decision.kind, ReplyKind::ContextStale);
    }

    #[test]
    fn last_opened_panel() {
        let mut fixture = Fixture::default();
        fixture.chat.last_opened_panel = Some(field(
            PanelRef {
                panel_id: waypoint_types::PanelId::new("panel-e"),
                title: "Panel E".to_string(),
            },
            false,
        ));
        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("what did you just open?"))),
            "I last opened Panel E."
        );
    }

    #[test]
    fn where_am_i_reads_live_ui() {
        let mut fixture = Fixture::default();
        fixture.ui.mode = UiMode::Workspace;
        fixture.ui.open_drawer = Some(PanelRef {
            panel_id: waypoint_types::PanelId::new("panel-notes"),
            title: "Quick Notes".to_string(),
        });
        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("where am I?"))),
            "You're on the workspace view with Quick Notes open."
        );
    }

    #[test]
    fn request_and_action_histories_stay_separate() {
        let mut fixture = Fixture::default();
        let action = Action::open_panel("panel-e", "Panel E");
        fixture.state.apply(
            SessionEffect::RecordRequest(HistoryEntry::for_action(
                HistoryKind::Open,
                &action,
                now(),
            )),
            now(),
        );

        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("did I ask you to open panel E?"))),
            "Yes, you asked me to open Panel E."
        );
        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("did you open panel E?"))),
            "No, I haven't done that for panel e."
        );
    }

    #[test]
    fn history_targets_match_whole_words() {
        let mut fixture = Fixture::default();
        let action = Action::open_panel("widget-demo", "Demo Widget");
        fixture.state.apply(
            SessionEffect::RecordAction(HistoryEntry::for_action(
                HistoryKind::Open,
                &action,
                now(),
            )),
            now(),
        );

        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("did you open e?"))),
            "No, I haven't done that for e."
        );
        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("did you open wid?"))),
            "No, I haven't done that for wid."
        );
        assert_eq!(
            answer(ContextQaTier.evaluate(&fixture.cx("did you open the demo widget?"))),
            "Yes, I opened Demo Widget."
        );
    }

    #[test]
    fn unrelated_input_passes() {
        let fixture = Fixture::default();
        assert!(matches!(
            ContextQaTier.evaluate(&fixture.cx("what time is it?")),
            TierOutcome::PassThrough
        ));
    }
}
