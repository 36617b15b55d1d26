//! The tier seam.
//!
//! A tier is a pure function of `(input, session state, chat context, UI
//! context)`. It never awaits: when it needs the bridge it returns
//! [`TierOutcome::Consult`], the router makes the call (the only suspension
//! point) and feeds the result back through [`Tier::resume`].

use std::time::SystemTime;

use waypoint_config::Tuning;
use waypoint_core::{CommandDef, SelectionSource, SessionEffect, SessionState};
use waypoint_providers::{BridgeError, BridgeReply, BridgeRequest};
use waypoint_types::{Candidate, ChatContext, TurnId, UiContext, UserScope};

use crate::decision::Decision;

/// Everything a tier may look at for one turn.
#[derive(Debug, Clone, Copy)]
pub struct TierContext<'a> {
    pub input: &'a str,
    /// Working copy: already reflects effects deferred by earlier tiers.
    pub state: &'a SessionState,
    pub chat: &'a ChatContext,
    pub ui: &'a UiContext,
    pub vocabulary: &'a [CommandDef],
    pub tuning: &'a Tuning,
    pub user: &'a UserScope,
    pub turn: TurnId,
    pub now: SystemTime,
    /// True on the need-context retry.
    pub extended: bool,
}

/// A pending bridge call plus what the tier needs to interpret its reply.
#[derive(Debug, Clone)]
pub struct Consultation {
    pub request: BridgeRequest,
    /// Bounded set the reply must choose from (empty for classification).
    pub candidates: Vec<Candidate>,
    pub source: Option<SelectionSource>,
}

#[derive(Debug, Clone)]
pub enum TierOutcome {
    Handled(Decision),
    PassThrough,
    /// Not handled, but later tiers must see these effects applied.
    Defer(Vec<SessionEffect>),
    Consult(Consultation),
    /// The model asked for a larger chat window.
    NeedContext,
}

pub trait Tier: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, cx: &TierContext<'_>) -> TierOutcome;

    fn resume(
        &self,
        _cx: &TierContext<'_>,
        _consultation: Consultation,
        _reply: Result<BridgeReply, BridgeError>,
    ) -> TierOutcome {
        TierOutcome::PassThrough
    }
}
