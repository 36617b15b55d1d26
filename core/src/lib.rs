//! Deterministic core of Waypoint.
//!
//! Vocabulary building, input normalization, the deterministic matchers,
//! the per-conversation Session State Store and selection arbitration. Every
//! function here is pure over its arguments: no IO, no async, no clocks
//! (callers pass `now`).

pub mod arbitration;
pub mod command;
pub mod fuzzy;
pub mod normalize;
pub mod ordinal;
pub mod phrases;
pub mod scope;
pub mod session;
pub mod vocabulary;

pub use arbitration::{Arbitration, SelectionSource, StaleTarget, arbitrate};
pub use command::is_explicit_command;
pub use fuzzy::{FuzzyMatch, fuzzy_match, fuzzy_match_with_floor, unique_high};
pub use normalize::{fold, normalize, tokens};
pub use ordinal::{OrdinalMatch, Position, match_ordinal};
pub use phrases::{Rejection, detect_rejection};
pub use scope::{ScopeCue, detect_scope_cue};
pub use session::{
    Clarification, EphemeralState, ExecutableContext, LastSuggestion, PendingOptions, Reconciled,
    SESSION_STATE_VERSION, SessionEffect, SessionState, WidgetLatch,
};
pub use vocabulary::{CommandDef, CommandSource, build, core_commands};
