//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap any `RoundTrip` so each call races a deadline
//! - Cancel the in-flight call when the deadline wins
//!
//! # Design Decisions
//! - The inner round trip runs as its own task; the caller's wait ends at
//!   the deadline even if cancellation has not taken effect yet
//! - The aborted task is never awaited
//! - Timeout errors are distinct from other errors (`is_timeout`)
//! - Only header acquisition is bounded; body streaming is not

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;

use crate::http::client::{RoundTrip, RoundTripResult, TransportError};

/// A `RoundTrip` decorator bounding every call by `deadline`.
pub struct TimeoutTransport {
    inner: Arc<dyn RoundTrip>,
    deadline: Duration,
}

impl TimeoutTransport {
    pub fn new(inner: Arc<dyn RoundTrip>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    /// Wrap `inner` when a deadline is configured, pass it through otherwise.
    pub fn wrap(inner: Arc<dyn RoundTrip>, deadline: Option<Duration>) -> Arc<dyn RoundTrip> {
        match deadline {
            Some(deadline) => Arc::new(Self::new(inner, deadline)),
            None => inner,
        }
    }
}

impl RoundTrip for TimeoutTransport {
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'static, RoundTripResult> {
        let deadline = self.deadline;
        let pending = self.inner.round_trip(request);

        Box::pin(async move {
            let mut call = tokio::spawn(pending);
            tokio::select! {
                joined = &mut call => joined.unwrap_or_else(|e| Err(TransportError::Task(e))),
                _ = tokio::time::sleep(deadline) => {
                    call.abort();
                    Err(TransportError::Timeout(deadline))
                }
            }
        })
    }
}
