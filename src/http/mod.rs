//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tee handler)
//!     → request.rs (buffer body once, build shadow clone)
//!         → shadow::dispatcher (background replay)
//!     → routing::rewrite (target URI)
//!     → client.rs (outbound round trip, behind resilience::timeouts)
//!     → response.rs (strip hop-by-hop, stream to client)
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{HyperTransport, RoundTrip, TransportError};
pub use request::{duplicate_request, Duplicated, ShadowRequest};
pub use server::HttpServer;
