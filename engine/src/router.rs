//! The tiered router.
//!
//! Runs the tiers in their fixed order against a working copy of session
//! state. Deferred effects are applied to the working copy only, so later
//! tiers see them; nothing reaches the caller's state until the turn
//! resolves and the caller commits [`RouteOutcome::effects`].
//!
//! Suspension points are bridge calls and the single need-context reload.
//! Both are raced against the conversation epoch through [`CancelGuard`].

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::watch;

use waypoint_config::Tuning;
use waypoint_context::{ContextSource, load_chat_context};
use waypoint_core::{CommandDef, SessionEffect, SessionState};
use waypoint_providers::LlmBridge;
use waypoint_types::{ChatContext, ConversationId, TurnId, UiContext, UserScope};

use crate::decision::Decision;
use crate::ladder;
use crate::tier::{Tier, TierContext, TierOutcome};
use crate::tiers::default_tiers;

/// Hard cap on need-context reloads per turn.
pub const NEED_CONTEXT_RETRIES: usize = 1;

/// Terminal reply when a larger window still did not help.
pub const RESHOW_REPLY: &str =
    "I can't find what you're referring to. Could you show it again or say it another way?";

// ============================================================================
// Cancellation
// ============================================================================

/// The turn was superseded by a stop phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Watches one conversation's epoch. The turn is cancelled once the epoch
/// moves past the value it started with.
#[derive(Debug, Clone)]
pub struct CancelGuard {
    rx: watch::Receiver<u64>,
    epoch: u64,
}

impl CancelGuard {
    #[must_use]
    pub fn new(rx: watch::Receiver<u64>) -> Self {
        let epoch = *rx.borrow();
        Self { rx, epoch }
    }

    /// Guard that can never fire.
    #[must_use]
    pub fn detached() -> Self {
        let (_tx, rx) = watch::channel(0);
        Self::new(rx)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() != self.epoch
    }

    /// Resolves once the epoch changes. Pends forever if the sender is gone.
    pub async fn cancelled(&mut self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// ============================================================================
// Routing
// ============================================================================

/// One turn's inputs, already snapshotted.
#[derive(Debug, Clone)]
pub struct RouteRequest<'a> {
    pub conversation: &'a ConversationId,
    pub input: &'a str,
    pub chat: ChatContext,
    pub ui: &'a UiContext,
    pub vocabulary: &'a [CommandDef],
    pub tuning: &'a Tuning,
    pub user: &'a UserScope,
    pub turn: TurnId,
    pub now: SystemTime,
}

#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub decision: Decision,
    /// Name of the tier that claimed the turn.
    pub tier: &'static str,
    /// Deferred effects first, then the decision's own.
    pub effects: Vec<SessionEffect>,
    pub bridge_calls: usize,
    /// True when the need-context reload ran.
    pub extended: bool,
}

pub struct Router {
    tiers: Vec<Box<dyn Tier>>,
    bridge: Arc<dyn LlmBridge>,
    source: Arc<dyn ContextSource>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers: Vec<&str> = self.tiers.iter().map(|t| t.name()).collect();
        f.debug_struct("Router")
            .field("tiers", &tiers)
            .field("bridge", &self.bridge.name())
            .finish_non_exhaustive()
    }
}

impl Router {
    #[must_use]
    pub fn new(bridge: Arc<dyn LlmBridge>, source: Arc<dyn ContextSource>) -> Self {
        Self::with_tiers(default_tiers(), bridge, source)
    }

    #[must_use]
    pub fn with_tiers(
        tiers: Vec<Box<dyn Tier>>,
        bridge: Arc<dyn LlmBridge>,
        source: Arc<dyn ContextSource>,
    ) -> Self {
        Self {
            tiers,
            bridge,
            source,
        }
    }

    /// Tier names in routing order.
    #[must_use]
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    pub async fn route(
        &self,
        request: RouteRequest<'_>,
        state: &SessionState,
        cancel: &mut CancelGuard,
    ) -> Result<RouteOutcome, Cancelled> {
        let mut working = state.clone();
        let mut deferred: Vec<SessionEffect> = Vec::new();
        let mut chat = request.chat.clone();
        let mut bridge_calls = 0;
        let mut reloads = 0;
        let mut extended = false;

        for tier in &self.tiers {
            loop {
                let cx = TierContext {
                    input: request.input,
                    state: &working,
                    chat: &chat,
                    ui: request.ui,
                    vocabulary: request.vocabulary,
                    tuning: request.tuning,
                    user: request.user,
                    turn: request.turn,
                    now: request.now,
                    extended,
                };

                let mut outcome = tier.evaluate(&cx);
                if let TierOutcome::Consult(consultation) = outcome {
                    bridge_calls += 1;
                    let reply = ladder::call_bridge(
                        self.bridge.as_ref(),
                        &consultation.request,
                        request.tuning.bridge.timeout,
                        cancel,
                    )
                    .await?;
                    outcome = tier.resume(&cx, consultation, reply);
                }

                match outcome {
                    TierOutcome::Handled(decision) => {
                        tracing::debug!(
                            turn = %request.turn,
                            tier = tier.name(),
                            kind = ?decision.kind,
                            resolution = decision.resolution.as_ref().map(|r| r.tag()),
                            "Turn claimed"
                        );
                        let mut effects = deferred;
                        effects.extend(decision.effects.iter().cloned());
                        return Ok(RouteOutcome {
                            decision,
                            tier: tier.name(),
                            effects,
                            bridge_calls,
                            extended,
                        });
                    }
                    TierOutcome::Defer(effects) => {
                        tracing::debug!(
                            turn = %request.turn,
                            tier = tier.name(),
                            count = effects.len(),
                            "Deferring effects"
                        );
                        working.apply_all(effects.iter().cloned(), request.now);
                        deferred.extend(effects);
                        break;
                    }
                    TierOutcome::PassThrough | TierOutcome::Consult(_) => break,
                    TierOutcome::NeedContext if reloads < NEED_CONTEXT_RETRIES => {
                        reloads += 1;
                        extended = true;
                        let limit = request.tuning.extended_window_messages;
                        tracing::debug!(
                            turn = %request.turn,
                            tier = tier.name(),
                            limit,
                            "Reloading with a larger window"
                        );
                        chat = tokio::select! {
                            biased;
                            () = cancel.cancelled() => return Err(Cancelled),
                            chat = load_chat_context(
                                self.source.as_ref(),
                                request.conversation,
                                limit,
                                request.now,
                                &request.tuning.decay,
                            ) => chat,
                        };
                    }
                    TierOutcome::NeedContext => {
                        tracing::info!(
                            turn = %request.turn,
                            tier = tier.name(),
                            "Context still insufficient after reload"
                        );
                        let decision = Decision::stale_with(RESHOW_REPLY);
                        return Ok(RouteOutcome {
                            decision,
                            tier: tier.name(),
                            effects: deferred,
                            bridge_calls,
                            extended,
                        });
                    }
                }
            }
        }

        // Only reachable with a custom tier list lacking a terminal tier.
        tracing::warn!(turn = %request.turn, "No tier claimed the turn");
        Ok(RouteOutcome {
            decision: Decision::unrecognized(crate::tiers::NOT_UNDERSTOOD),
            tier: "none",
            effects: deferred,
            bridge_calls,
            extended,
        })
    }
}
