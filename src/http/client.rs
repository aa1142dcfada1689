//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Define the one-round-trip seam (`RoundTrip`) both dispatchers call
//! - Provide the pooled hyper client implementation
//! - Classify transport failures (timeout vs. everything else)
//!
//! # Design Decisions
//! - Round trips return `'static` boxed futures so a caller can hand them
//!   to their own task (the timeout wrapper does)
//! - Response bodies are left streaming; callers decide whether to pipe
//!   them to a client or drain them

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single outbound round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The deadline elapsed before response headers arrived.
    #[error("round trip timed out after {0:?}")]
    Timeout(Duration),

    /// DNS, connect, reset or protocol failure.
    #[error("upstream request failed: {0}")]
    Upstream(BoxError),

    /// The task driving the round trip panicked or was cancelled.
    #[error("round trip task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

impl From<hyper_util::client::legacy::Error> for TransportError {
    fn from(e: hyper_util::client::legacy::Error) -> Self {
        // The legacy error's Display drops its cause; keep it.
        match std::error::Error::source(&e) {
            Some(cause) => TransportError::Upstream(format!("{}: {}", e, cause).into()),
            None => TransportError::Upstream(Box::new(e)),
        }
    }
}

pub type RoundTripResult = Result<Response<Body>, TransportError>;

/// Perform exactly one request/response exchange with a backend.
pub trait RoundTrip: Send + Sync {
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'static, RoundTripResult>;
}

impl<T: RoundTrip + ?Sized> RoundTrip for Arc<T> {
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'static, RoundTripResult> {
        (**self).round_trip(request)
    }
}

/// Pooled HTTP/1.1 client over plain TCP.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
}

impl HyperTransport {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundTrip for HyperTransport {
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'static, RoundTripResult> {
        let pending = self.client.request(request);
        Box::pin(async move {
            let response: Response<Incoming> = pending.await?;
            Ok::<_, TransportError>(response.map(Body::new))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_distinguishable() {
        let timeout = TransportError::Timeout(Duration::from_millis(5));
        let refused = TransportError::Upstream("connection refused".into());

        assert!(timeout.is_timeout());
        assert!(!refused.is_timeout());
        assert_eq!(timeout.to_string(), "round trip timed out after 5ms");
    }

    #[tokio::test]
    async fn test_connection_refused_is_upstream_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = Request::builder()
            .uri(format!("http://{}/", addr))
            .body(Body::empty())
            .unwrap();
        let err = HyperTransport::new().round_trip(request).await.unwrap_err();

        assert!(matches!(err, TransportError::Upstream(_)));
        assert!(!err.is_timeout());
    }
}
