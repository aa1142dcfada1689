//! HTTP server setup and the tee handler.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all tee handler
//! - Wire up middleware (tracing)
//! - Bind server to listener, stop when the shutdown flag is raised
//! - Duplicate every request, hand the copy to the shadow dispatcher
//! - Rewrite the original to the target and forward it
//! - Stream the target's response back to the client

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::{DefaultOnFailure, TraceLayer};

use crate::config::{HostsConfig, TeeConfig};
use crate::http::client::{HyperTransport, RoundTrip};
use crate::http::request::duplicate_request;
use crate::http::response::{into_client_response, transport_failure};
use crate::lifecycle::shutdown::stopped;
use crate::observability::metrics;
use crate::observability::CorrelationId;
use crate::resilience::{RetryPolicy, TimeoutTransport};
use crate::routing::rewrite::target_uri;
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::shadow::ShadowDispatcher;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub hosts: Arc<HostsConfig>,
    pub primary: Arc<dyn RoundTrip>,
    pub shadow: Arc<ShadowDispatcher>,
}

/// HTTP server for the tee proxy.
pub struct HttpServer {
    router: Router,
    config: TeeConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Both paths share one pooled hyper client.
    pub fn new(config: TeeConfig) -> Self {
        let transport: Arc<dyn RoundTrip> = Arc::new(HyperTransport::new());
        Self::with_transports(config, transport.clone(), transport)
    }

    /// Create a server over caller-provided transports.
    ///
    /// The configured round-trip deadline is applied on top of both.
    pub fn with_transports(
        config: TeeConfig,
        primary: Arc<dyn RoundTrip>,
        shadow: Arc<dyn RoundTrip>,
    ) -> Self {
        let deadline = config.timeouts.round_trip();
        let shadow = ShadowDispatcher::new(
            TimeoutTransport::wrap(shadow, deadline),
            RetryPolicy::from_config(&config.retries),
        );

        let state = AppState {
            hosts: Arc::new(config.hosts.clone()),
            primary: TimeoutTransport::wrap(primary, deadline),
            shadow: Arc::new(shadow),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(tee_handler))
            .route("/", any(tee_handler))
            .with_state(state)
            // Upstream 5xx are already logged with their correlation ID.
            .layer(
                TraceLayer::new_for_http()
                    .on_failure(DefaultOnFailure::new().level(tracing::Level::DEBUG)),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown flag is raised.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target = %self.config.hosts.target,
            alternative = %self.config.hosts.alternative,
            max_attempts = self.config.retries.max_attempts,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stopped(shutdown).await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Tee handler: every inbound request goes to both backends.
async fn tee_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let correlation_id = CorrelationId::new();
    let method = request.method().to_string();

    let duplicated = duplicate_request(request, &state.hosts.alternative).await;

    tracing::info!(
        correlation_id = %correlation_id,
        peer = %peer,
        request = %duplicated.inbound_dump(),
        "Inbound request"
    );
    if let Some(e) = &duplicated.body_error {
        tracing::error!(
            correlation_id = %correlation_id,
            error = %e,
            bytes_read = duplicated.body.len(),
            "Failed to read inbound body, forwarding what was read"
        );
    }

    match duplicated.shadow {
        Ok(shadow) => {
            // Detached: the handle is dropped and the task runs on its own.
            state.shadow.dispatch(correlation_id, shadow);
        }
        Err(e) => {
            tracing::error!(
                correlation_id = %correlation_id,
                error = %e,
                "Cannot build shadow request, skipping shadow"
            );
        }
    }

    let response = forward_to_target(&state, correlation_id, duplicated.primary, peer).await;
    metrics::record_primary(&method, response.status().as_u16(), start_time);
    response
}

/// Rewrite `request` to the target backend and forward it.
async fn forward_to_target(
    state: &AppState,
    correlation_id: CorrelationId,
    mut request: Request<Body>,
    peer: SocketAddr,
) -> Response {
    let uri = match target_uri(&state.hosts.target, request.uri()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(correlation_id = %correlation_id, error = %e, "Cannot build target request");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid target").into_response();
        }
    };
    let host = uri
        .authority()
        .and_then(|a| HeaderValue::from_str(a.as_str()).ok());
    let target = uri.to_string();

    *request.uri_mut() = uri;
    *request.version_mut() = Version::HTTP_11;
    let headers = request.headers_mut();
    strip_hop_by_hop(headers);
    append_forwarded_for(headers, peer.ip());
    if let Some(host) = host {
        headers.insert(header::HOST, host);
    }

    match state.primary.round_trip(request).await {
        Ok(response) => {
            tracing::info!(
                correlation_id = %correlation_id,
                target = %target,
                status = %response.status(),
                "Primary response"
            );
            into_client_response(response)
        }
        Err(e) => {
            tracing::error!(
                correlation_id = %correlation_id,
                target = %target,
                timeout = e.is_timeout(),
                error = %e,
                "Primary request failed"
            );
            transport_failure(&e)
        }
    }
}
