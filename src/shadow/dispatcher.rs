//! Shadow dispatch.
//!
//! # Responsibilities
//! - Replay one duplicated request against the alternative backend in a
//!   background task
//! - Retry 5xx responses per the retry policy
//! - Log every attempt and response under the request's correlation ID
//! - Contain every failure, including panics, inside the task
//!
//! # States
//! ```text
//! Start → Attempt(n) → Completed        (status not 5xx)
//!                    → TransportFailed  (no retry)
//!                    → Attempt(n + 1)   (5xx, attempts left, after interval)
//!                    → Exhausted        (5xx on the last attempt)
//! ```
//!
//! # Design Decisions
//! - One task per inbound request, no pool and no limit
//! - The task owns its request copy and ID; nothing is shared with the
//!   primary path
//! - Client disconnects do not cancel shadow tasks

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::FutureExt;
use tokio::task::JoinHandle;

use crate::http::client::RoundTrip;
use crate::http::request::ShadowRequest;
use crate::http::response::drain_and_dump;
use crate::observability::metrics;
use crate::observability::CorrelationId;
use crate::resilience::retries::{RetryDecision, RetryPolicy};

/// How a shadow task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowOutcome {
    /// A non-5xx response ended the task.
    Completed { status: StatusCode, attempts: u32 },
    /// Every allowed attempt returned 5xx.
    Exhausted { status: StatusCode, attempts: u32 },
    /// A transport error ended the task; it is never retried.
    TransportFailed { attempts: u32, timed_out: bool },
    /// The task panicked; the fault was logged and contained.
    Faulted,
}

impl ShadowOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ShadowOutcome::Completed { .. } => "completed",
            ShadowOutcome::Exhausted { .. } => "exhausted",
            ShadowOutcome::TransportFailed { .. } => "transport_failed",
            ShadowOutcome::Faulted => "faulted",
        }
    }
}

/// Replays duplicated requests against the alternative backend.
pub struct ShadowDispatcher {
    transport: Arc<dyn RoundTrip>,
    policy: RetryPolicy,
}

impl ShadowDispatcher {
    pub fn new(transport: Arc<dyn RoundTrip>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Spawn the replay of `request` as its own task and return at once.
    ///
    /// The handle is only useful for tests; the proxy drops it.
    pub fn dispatch(
        self: &Arc<Self>,
        id: CorrelationId,
        request: ShadowRequest,
    ) -> JoinHandle<ShadowOutcome> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(dispatcher.replay(id, &request))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => {
                    tracing::error!(
                        correlation_id = %id,
                        fault = %panic_message(panic.as_ref()),
                        request = %request.dump(),
                        "Recovered from fault in shadow dispatcher"
                    );
                    ShadowOutcome::Faulted
                }
            };
            metrics::record_shadow_outcome(outcome.label());
            outcome
        })
    }

    async fn replay(&self, id: CorrelationId, request: &ShadowRequest) -> ShadowOutcome {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let response = match self.transport.round_trip(request.to_request()).await {
                Ok(response) => response,
                Err(e) => {
                    metrics::record_shadow_attempt(None);
                    tracing::error!(
                        correlation_id = %id,
                        attempt,
                        timeout = e.is_timeout(),
                        error = %e,
                        request = %request.dump(),
                        "Shadow request failed"
                    );
                    return ShadowOutcome::TransportFailed {
                        attempts: attempt,
                        timed_out: e.is_timeout(),
                    };
                }
            };

            let status = response.status();
            metrics::record_shadow_attempt(Some(status.as_u16()));

            match drain_and_dump(response).await {
                Ok(dump) => tracing::info!(
                    correlation_id = %id,
                    attempt,
                    response = %dump,
                    "Shadow response"
                ),
                Err(e) => tracing::error!(
                    correlation_id = %id,
                    attempt,
                    status = %status,
                    error = %e,
                    "Failed to dump shadow response"
                ),
            }

            match self.policy.decide(status, attempt) {
                RetryDecision::Stop => {
                    return ShadowOutcome::Completed {
                        status,
                        attempts: attempt,
                    };
                }
                RetryDecision::Retry => {
                    tracing::warn!(
                        correlation_id = %id,
                        status = %status,
                        retry = attempt,
                        max_attempts,
                        delay = ?self.policy.interval(),
                        "Shadow backend returned server error, retrying"
                    );
                    tokio::time::sleep(self.policy.interval()).await;
                }
                RetryDecision::GiveUp => {
                    tracing::error!(
                        correlation_id = %id,
                        status = %status,
                        attempts = attempt,
                        "request failed"
                    );
                    return ShadowOutcome::Exhausted {
                        status,
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
