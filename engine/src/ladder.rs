//! Deterministic → constrained-LLM ladder.
//!
//! Runs only after arbitration came back inconclusive, and only ever over the
//! bounded candidate set arbitration produced:
//!
//! 1. a relaxed deterministic pass ([`relaxed_pick`]),
//! 2. a bounded `select` consultation ([`consult_select`]),
//! 3. validation that the chosen id is in the set ([`validate_choice`]),
//! 4. otherwise a grounded clarifier re-showing the same set
//!    ([`grounded_clarifier`]).
//!
//! The dual-source ordinal case never reaches this module.

use std::time::{Duration, Instant};

use waypoint_config::Thresholds;
use waypoint_core::fuzzy::{containing_candidates, rank_candidates};
use waypoint_core::{SelectionSource, SessionEffect};
use waypoint_providers::{BridgeError, BridgeReply, BridgeRequest, LlmBridge};
use waypoint_types::text::numbered_list;
use waypoint_types::{Candidate, candidate::labels};

use crate::decision::{ClarifyReason, Decision};
use crate::router::{CancelGuard, Cancelled};
use crate::tier::{Consultation, TierContext};

/// Step 1: containment, then fuzzy ranking with the relaxed floor. Needs a
/// medium-confidence winner clear of the runner-up.
#[must_use]
pub fn relaxed_pick(
    remainder: &str,
    candidates: &[Candidate],
    thresholds: &Thresholds,
) -> Option<usize> {
    if let [only] = containing_candidates(remainder, candidates).as_slice() {
        return Some(*only);
    }
    let ranked = rank_candidates(remainder, candidates, thresholds.relaxed_floor);
    let &(best, score) = ranked.first()?;
    let clear = ranked
        .get(1)
        .is_none_or(|&(_, second)| score - second >= thresholds.ambiguity_margin);
    (score >= thresholds.medium && clear).then_some(best)
}

/// Step 2: ask the bridge to pick from exactly `candidates`.
#[must_use]
pub fn consult_select(
    cx: &TierContext<'_>,
    remainder: &str,
    source: SelectionSource,
    candidates: Vec<Candidate>,
) -> Consultation {
    let message = if remainder.is_empty() { cx.input } else { remainder };
    let request = BridgeRequest::select(cx.turn, message, cx.chat.clone(), &candidates)
        .with_extended_context(cx.extended);
    Consultation {
        request,
        candidates,
        source: Some(source),
    }
}

/// Step 3: the chosen candidate, only if its id is in the bounded set.
#[must_use]
pub fn validate_choice<'a>(
    reply: &BridgeReply,
    candidates: &'a [Candidate],
) -> Option<(usize, &'a Candidate)> {
    let BridgeReply::Select { choice_id } = reply else {
        return None;
    };
    candidates
        .iter()
        .enumerate()
        .find(|(_, c)| c.id.as_str() == choice_id)
}

/// Step 4: re-show the same candidates and open (or keep) a clarification.
#[must_use]
pub fn grounded_clarifier(
    source: &SelectionSource,
    candidates: &[Candidate],
    question: &str,
    reason: ClarifyReason,
) -> Decision {
    let reply = format!("{question}\n{}", numbered_list(&labels(candidates)));
    let reshow = match source {
        SelectionSource::Chat(_) => SessionEffect::ReshowLastOptions,
        SelectionSource::Widget { id, title } => SessionEffect::EngageLatch {
            widget_id: id.clone(),
            title: title.clone(),
        },
    };
    Decision::clarify(reason, reply)
        .with_options(candidates.to_vec())
        .with_effect(reshow)
        .with_effect(SessionEffect::EnterClarification {
            question: question.to_string(),
            pending_position: None,
        })
}

/// Call the bridge, racing it against `timeout` and against cancellation.
/// A reply that lands after the turn was cancelled is dropped.
pub async fn call_bridge(
    bridge: &dyn LlmBridge,
    request: &BridgeRequest,
    timeout: Duration,
    cancel: &mut CancelGuard,
) -> Result<Result<BridgeReply, BridgeError>, Cancelled> {
    let started = Instant::now();
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(Cancelled),
        result = tokio::time::timeout(timeout, bridge.call(request)) => result,
    };
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }

    let elapsed = started.elapsed();
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let result = result.unwrap_or(Err(BridgeError::Timeout { elapsed }));
    match &result {
        Ok(reply) => tracing::debug!(
            bridge = bridge.name(),
            turn = %request.turn,
            task = request.task.as_str(),
            intent = reply.intent(),
            elapsed_ms,
            "Bridge replied"
        ),
        Err(err) => tracing::warn!(
            bridge = bridge.name(),
            turn = %request.turn,
            task = request.task.as_str(),
            elapsed_ms,
            error = %err,
            "Bridge call failed"
        ),
    }
    Ok(result)
}
