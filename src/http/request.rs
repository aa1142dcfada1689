//! Request duplication.
//!
//! # Responsibilities
//! - Buffer the inbound body exactly once
//! - Re-install the bytes into the primary-bound request
//! - Build the shadow clone: alternative URI, sanitized headers, buffered
//!   body that can be replayed any number of times
//! - Render requests as text for logging
//!
//! # Design Decisions
//! - Whole bodies are held in memory; replay across retries and both
//!   destinations needs the bytes, not a stream
//! - `Bytes` clones share one allocation, so both copies are cheap and
//!   immutable
//! - A body read failure is not fatal: whatever was read is forwarded

use axum::body::{Body, Bytes};
use axum::http::{
    header::{self, HeaderMap, HeaderValue},
    Method, Request, Uri, Version,
};
use futures_util::StreamExt;
use url::Url;

use crate::routing::rewrite::{alternative_uri, RewriteError};
use crate::security::headers::sanitize;

/// Independent, fully buffered copy of an inbound request addressed at the
/// alternative backend.
#[derive(Debug, Clone)]
pub struct ShadowRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl ShadowRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Materialize a fresh outbound request over the buffered body.
    ///
    /// Every call yields a body positioned at the first byte, so a
    /// previous attempt never starves the next one.
    pub fn to_request(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = Version::HTTP_11;
        *request.headers_mut() = self.headers.clone();

        // The inbound Host named the proxy, not the alternative.
        if let Some(value) = self
            .uri
            .authority()
            .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        {
            request.headers_mut().insert(header::HOST, value);
        }
        request
    }

    pub fn dump(&self) -> String {
        dump_request(
            &self.method,
            &self.uri.to_string(),
            self.version,
            &self.headers,
            &self.body,
        )
    }
}

/// Result of duplicating one inbound request.
pub struct Duplicated {
    /// The inbound request with its body re-installed, still addressed as
    /// received.
    pub primary: Request<Body>,
    /// The shadow clone, unless its URI could not be built.
    pub shadow: Result<ShadowRequest, RewriteError>,
    /// The buffered inbound body.
    pub body: Bytes,
    /// Set when the inbound body stream failed part way.
    pub body_error: Option<axum::Error>,
}

impl Duplicated {
    /// Text rendering of the inbound request as received.
    pub fn inbound_dump(&self) -> String {
        let target = self
            .primary
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        dump_request(
            self.primary.method(),
            target,
            self.primary.version(),
            self.primary.headers(),
            &self.body,
        )
    }
}

/// Split `request` into a primary-ready request and a shadow clone.
pub async fn duplicate_request(request: Request<Body>, alternative: &Url) -> Duplicated {
    let (mut parts, body) = request.into_parts();
    let (body, body_error) = buffer_body(body).await;

    if body_error.is_some() {
        // Declared length no longer matches what will be sent.
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    }

    let shadow = alternative_uri(alternative, &parts.uri).map(|uri| ShadowRequest {
        method: parts.method.clone(),
        uri,
        version: parts.version,
        headers: sanitize(&parts.headers).into_owned(),
        body: body.clone(),
    });

    Duplicated {
        primary: Request::from_parts(parts, Body::from(body.clone())),
        shadow,
        body,
        body_error,
    }
}

/// Read a body to the end, keeping what was read if the stream fails.
async fn buffer_body(body: Body) -> (Bytes, Option<axum::Error>) {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(e) => return (Bytes::from(buf), Some(e)),
        }
    }
    (Bytes::from(buf), None)
}

/// Render a request as `METHOD target VERSION`, headers, blank line, body.
pub fn dump_request(
    method: &Method,
    target: &str,
    version: Version,
    headers: &HeaderMap,
    body: &[u8],
) -> String {
    let mut out = format!("{} {} {:?}\r\n", method, target, version);
    push_headers(&mut out, headers);
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(body));
    out
}

pub(crate) fn push_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(&String::from_utf8_lossy(value.as_bytes()));
        out.push_str("\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn alternative() -> Url {
        Url::parse("http://shadow:8081/alt").unwrap()
    }

    async fn body_bytes(body: Body) -> Bytes {
        axum::body::to_bytes(body, usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn test_both_copies_carry_the_original_body() {
        let payload = b"{\"amount\": 42}".to_vec();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/orders?x=1")
            .header("content-type", "application/json")
            .header("content-length", payload.len())
            .body(Body::from(payload.clone()))
            .unwrap();

        let dup = duplicate_request(request, &alternative()).await;
        assert!(dup.body_error.is_none());

        let shadow = dup.shadow.unwrap();
        assert_eq!(shadow.method(), Method::POST);
        assert_eq!(shadow.uri().to_string(), "http://shadow:8081/alt/orders?x=1");
        assert_eq!(&shadow.body()[..], &payload[..]);

        assert_eq!(dup.primary.uri(), "/orders?x=1");
        assert_eq!(&body_bytes(dup.primary.into_body()).await[..], &payload[..]);
    }

    #[tokio::test]
    async fn test_shadow_body_replays_identically() {
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/items/7")
            .body(Body::from("replay me"))
            .unwrap();
        let shadow = duplicate_request(request, &alternative()).await.shadow.unwrap();

        for _ in 0..3 {
            let outbound = shadow.to_request();
            assert_eq!(outbound.uri(), "http://shadow:8081/alt/items/7");
            assert_eq!(&body_bytes(outbound.into_body()).await[..], b"replay me");
        }
    }

    #[tokio::test]
    async fn test_shadow_headers_are_sanitized() {
        let request = Request::builder()
            .uri("/")
            .header("host", "proxy.local:8888")
            .header("connection", "keep-alive")
            .header("upgrade", "websocket")
            .header("x-trace", "abc")
            .body(Body::empty())
            .unwrap();

        let dup = duplicate_request(request, &alternative()).await;
        let shadow = dup.shadow.unwrap();
        assert!(!shadow.headers().contains_key("connection"));
        assert!(!shadow.headers().contains_key("upgrade"));
        assert_eq!(shadow.headers().get("x-trace").unwrap(), "abc");

        let outbound = shadow.to_request();
        assert_eq!(outbound.headers().get("host").unwrap(), "shadow:8081");
        assert_eq!(outbound.version(), Version::HTTP_11);

        // The primary copy is not sanitized here.
        assert!(dup.primary.headers().contains_key("connection"));
        assert_eq!(dup.primary.headers().get("host").unwrap(), "proxy.local:8888");
    }

    #[tokio::test]
    async fn test_failed_body_read_keeps_partial_bytes() {
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"partial ")),
            Ok(Bytes::from_static(b"data")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ];
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header("content-length", "1000")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();

        let dup = duplicate_request(request, &alternative()).await;
        assert!(dup.body_error.is_some());
        assert_eq!(&dup.body[..], b"partial data");
        assert_eq!(dup.primary.headers().get("content-length").unwrap(), "12");

        let shadow = dup.shadow.unwrap();
        assert_eq!(&shadow.body()[..], b"partial data");
        assert_eq!(shadow.headers().get("content-length").unwrap(), "12");
        assert_eq!(&body_bytes(dup.primary.into_body()).await[..], b"partial data");
    }

    #[tokio::test]
    async fn test_inbound_dump() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/foo?x=1")
            .header("host", "proxy")
            .body(Body::from("a=b"))
            .unwrap();

        let dup = duplicate_request(request, &alternative()).await;
        assert_eq!(
            dup.inbound_dump(),
            "POST /foo?x=1 HTTP/1.1\r\nhost: proxy\r\n\r\na=b"
        );
    }
}
