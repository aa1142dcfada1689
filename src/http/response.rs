//! Response handling.
//!
//! # Responsibilities
//! - Prepare primary responses for the client (hop-by-hop stripped,
//!   otherwise verbatim and streaming)
//! - Map primary transport failures to 502 / 504
//! - Drain and render shadow responses for logging
//!
//! # Design Decisions
//! - Primary bodies are never buffered
//! - Shadow bodies are always read to the end so the connection can return
//!   to the pool
//! - Backend timeouts result in 504 Gateway Timeout

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

use crate::http::client::TransportError;
use crate::http::request::push_headers;
use crate::security::headers::strip_hop_by_hop;

/// Strip connection-scoped headers from a backend response before it is
/// returned to the client. The body keeps streaming.
pub fn into_client_response(response: Response<Body>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, body)
}

/// Response sent to the client when the primary round trip failed.
pub fn transport_failure(error: &TransportError) -> Response<Body> {
    if error.is_timeout() {
        (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
    }
}

/// Read a response body to the end and render the whole response as
/// `VERSION STATUS`, headers, blank line, body.
pub async fn drain_and_dump(response: Response<Body>) -> Result<String, axum::Error> {
    let (parts, body) = response.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await?;

    let mut out = format!("{:?} {}\r\n", parts.version, parts.status);
    push_headers(&mut out, &parts.headers);
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(&body));
    Ok(out)
}
