//! Header manipulation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers before any outbound send
//! - Add X-Forwarded-For on the primary path
//!
//! # Design Decisions
//! - The shadow clone is sanitized copy-on-write: no allocation when the
//!   inbound request carries no hop-by-hop header
//! - The primary path also drops headers named by `Connection`, as a
//!   forwarding proxy must

use std::borrow::Cow;
use std::net::IpAddr;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Headers that only describe a single connection and are never forwarded.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Returns true if the header name is in the fixed hop-by-hop set.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Remove the hop-by-hop set from a header map.
///
/// Returns the input untouched (borrowed) when none of the headers are
/// present; only allocates a copy when something must be removed.
pub fn sanitize(headers: &HeaderMap) -> Cow<'_, HeaderMap> {
    if !headers.keys().any(|name| is_hop_by_hop(name.as_str())) {
        return Cow::Borrowed(headers);
    }

    let mut owned = headers.clone();
    for name in HOP_BY_HOP_HEADERS {
        owned.remove(name);
    }
    Cow::Owned(owned)
}

/// Strip hop-by-hop headers in place, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// Append the client address to `X-Forwarded-For`, keeping prior hops.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let prior = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ");

    let value = if prior.is_empty() {
        client.to_string()
    } else {
        format!("{}, {}", prior, client)
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR.clone(), value);
    }
}
