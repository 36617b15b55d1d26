//! Short-horizon retry for bridge HTTP calls.
//!
//! The bridge sits on the interactive path and the router gives every call a
//! few seconds at most, so the policy is small: one retry by default, short
//! capped backoff with down-jitter, and `Retry-After` honoured only when it
//! fits inside the backoff cap.
//!
//! Retryable: HTTP 408, 409, 429, 5xx and connection errors. The
//! `x-should-retry` response header overrides the status-based decision.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Down-jitter: the delay is multiplied by a factor in `[1 - jitter, 1]`.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(1),
            jitter_factor: 0.25,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// `Retry-After-Ms` (float milliseconds) or `Retry-After` (integer seconds),
/// accepted only when positive and no longer than `cap`.
#[must_use]
pub fn retry_after(headers: &HeaderMap, cap: Duration) -> Option<Duration> {
    let within = |d: Duration| (d > Duration::ZERO && d <= cap).then_some(d);

    if let Some(val) = headers.get("retry-after-ms")
        && let Ok(s) = val.to_str()
        && let Ok(ms) = s.trim().parse::<f64>()
        && ms.is_finite()
        && ms > 0.0
    {
        return within(Duration::from_secs_f64(ms / 1000.0));
    }

    if let Some(val) = headers.get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.trim().parse::<u64>()
    {
        return within(Duration::from_secs(secs));
    }

    None
}

#[must_use]
pub fn is_retryable_status(status: StatusCode, headers: &HeaderMap) -> bool {
    if let Some(val) = headers.get("x-should-retry")
        && let Ok(s) = val.to_str()
    {
        if s.eq_ignore_ascii_case("true") {
            return true;
        }
        if s.eq_ignore_ascii_case("false") {
            return false;
        }
    }

    matches!(status.as_u16(), 408 | 409 | 429 | 500..=599)
}

#[must_use]
pub fn backoff_delay(attempt: u32, policy: &RetryPolicy, headers: Option<&HeaderMap>) -> Duration {
    if let Some(headers) = headers
        && let Some(delay) = retry_after(headers, policy.max_delay)
    {
        return delay;
    }

    let base = policy.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt as i32);
    let capped = base.min(policy.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * policy.jitter_factor.clamp(0.0, 1.0);
    Duration::from_secs_f64(capped * jitter)
}

/// Result of [`send_with_retry`]. A non-2xx response is never reported as
/// success.
#[derive(Debug)]
pub enum SendOutcome {
    Success(Response),
    HttpError(Response),
    Transport { attempts: u32, source: reqwest::Error },
}

/// Send the request built by `build`, retrying per `policy`.
///
/// Every attempt carries the same `Idempotency-Key` and an `X-Retry-Count`
/// header (0 for the first attempt).
pub async fn send_with_retry<F>(build: F, policy: &RetryPolicy) -> SendOutcome
where
    F: Fn() -> RequestBuilder,
{
    let idempotency_key = format!("waypoint-{}", Uuid::new_v4());
    let mut attempt: u32 = 0;

    loop {
        let can_retry = attempt < policy.max_retries;
        let request = build()
            .header("X-Retry-Count", attempt.to_string())
            .header("Idempotency-Key", &idempotency_key);

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return SendOutcome::Success(response);
                }
                if !can_retry || !is_retryable_status(status, response.headers()) {
                    return SendOutcome::HttpError(response);
                }
                let delay = backoff_delay(attempt, policy, Some(response.headers()));
                tracing::debug!(
                    status = %status,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying bridge request after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                let retryable = err.is_connect() || err.is_timeout() || err.is_request();
                if !can_retry || !retryable {
                    return SendOutcome::Transport {
                        attempts: attempt + 1,
                        source: err,
                    };
                }
                let delay = backoff_delay(attempt, policy, None);
                tracing::debug!(
                    error = %err,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying bridge request after transport error"
                );
                tokio::time::sleep(delay).await;
            }
        }

        attempt += 1;
    }
}
