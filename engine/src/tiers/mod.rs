//! The tiers, in routing order.
//!
//! Order is a contract: each tier's "not handled" conditions assume the
//! tiers before it already had their chance.

mod context_qa;
mod general;
mod grounding;
mod interrupt;
mod known_noun;
mod resume;
mod selection;
mod stop;
mod suggestion;
mod unresolved;

use std::time::SystemTime;

pub use context_qa::ContextQaTier;
pub use general::GeneralTier;
pub use grounding::{GENERIC_FALLBACK, GroundingTier};
pub use interrupt::InterruptTier;
pub use known_noun::KnownNounTier;
pub use resume::ResumeTier;
pub use selection::SelectionTier;
pub use stop::StopTier;
pub use suggestion::{REJECTION_REPLY, SuggestionTier};
pub use unresolved::{NOT_UNDERSTOOD, UnresolvedTier};

use waypoint_core::{CommandDef, SessionEffect};
use waypoint_types::{Action, HistoryEntry, HistoryKind, Resolution};

use crate::decision::Decision;
use crate::tier::Tier;

/// The fixed pipeline.
#[must_use]
pub fn default_tiers() -> Vec<Box<dyn Tier>> {
    vec![
        Box::new(StopTier),
        Box::new(ResumeTier),
        Box::new(InterruptTier),
        Box::new(SuggestionTier),
        Box::new(SelectionTier),
        Box::new(KnownNounTier),
        Box::new(GroundingTier),
        Box::new(ContextQaTier),
        Box::new(GeneralTier),
        Box::new(UnresolvedTier),
    ]
}

pub(crate) fn action_reply(action: &Action) -> String {
    match action {
        Action::OpenPanel { title, .. } => format!("Opening {title}."),
        Action::Navigate { target } => format!("Going to {}.", target.target_name),
    }
}

pub(crate) fn history_kind(action: &Action) -> HistoryKind {
    match action {
        Action::OpenPanel { .. } => HistoryKind::Open,
        Action::Navigate { .. } => HistoryKind::Navigate,
    }
}

/// Execute a vocabulary command as a brand-new request: competing selection
/// state goes away and the request is recorded.
pub(crate) fn command_decision(command: &CommandDef, now: SystemTime) -> Decision {
    let action = command.action.clone();
    Decision::action(Resolution::from(action.clone()), action_reply(&action)).with_effects([
        SessionEffect::RecordRequest(HistoryEntry::for_action(history_kind(&action), &action, now)),
        SessionEffect::ClearPendingOptions,
        SessionEffect::ReleaseLatch,
        SessionEffect::ExitClarification,
    ])
}
