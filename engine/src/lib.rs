//! Chat intent resolution for Waypoint.
//!
//! Turns one free-form chat message into at most one validated
//! [`Resolution`](waypoint_types::Resolution) plus a reply, by running a fixed
//! list of tiers against session state, chat context and live UI context.
//!
//! Entry point is [`Engine::handle_turn`]. The host supplies four seams:
//! an [`LlmBridge`](waypoint_providers::LlmBridge), a
//! [`ContextSource`](waypoint_context::ContextSource), an [`ActionExecutor`]
//! and a [`SessionStore`].

pub mod conversation;
pub mod decision;
pub mod executor;
pub mod ladder;
pub mod retrieval;
pub mod router;
pub mod store;
pub mod tier;
pub mod tiers;

pub use conversation::{EXECUTION_FAILED, Engine, EngineBuilder, TurnInput, TurnOutcome};
pub use decision::{ClarifyReason, Decision, ReplyKind, STALE_REPLY};
pub use executor::{ActionExecutor, ExecFut, ExecutionReport, RecordingExecutor};
pub use retrieval::{
    AppDataSource, AppRecord, InMemoryDataSource, LookupError, LookupQuery, RetrievalExecutor,
};
pub use router::{CancelGuard, Cancelled, NEED_CONTEXT_RETRIES, RESHOW_REPLY, RouteOutcome, Router};
pub use store::{FileSessionStore, InMemorySessionStore, SessionStore, StoreError};
pub use tier::{Consultation, Tier, TierContext, TierOutcome};
pub use tiers::{GENERIC_FALLBACK, NOT_UNDERSTOOD, REJECTION_REPLY, default_tiers};

pub use waypoint_config as config;
pub use waypoint_context as context;
pub use waypoint_core as matchers;
pub use waypoint_providers as providers;
pub use waypoint_types as types;
