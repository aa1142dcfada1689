//! Destination rewriting.
//!
//! # Responsibilities
//! - Join a backend base path with the inbound path (single slash)
//! - Merge the backend base query with the inbound query
//! - Build the outbound URI for the target and the alternative
//!
//! # Design Decisions
//! - The target merges queries; the alternative keeps the inbound query
//!   verbatim and ignores its own base query
//! - No percent-decoding: paths and queries are carried as raw strings

use axum::http::uri::{Authority, PathAndQuery, Scheme, Uri};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("backend url '{0}' has no host")]
    MissingHost(String),

    #[error("invalid rewritten uri: {0}")]
    Uri(#[from] axum::http::Error),
}

/// Join two path segments with exactly one slash between them.
pub fn single_joining_slash(a: &str, b: &str) -> String {
    let a_slash = a.ends_with('/');
    let b_slash = b.starts_with('/');
    match (a_slash, b_slash) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}

/// Merge a base query with the inbound query.
pub fn merge_query(base: &str, query: &str) -> String {
    if base.is_empty() || query.is_empty() {
        format!("{}{}", base, query)
    } else {
        format!("{}&{}", base, query)
    }
}

/// `host[:port]` of a backend base URL.
pub fn authority(url: &Url) -> Result<String, RewriteError> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| RewriteError::MissingHost(url.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Outbound URI for the primary backend.
pub fn target_uri(target: &Url, inbound: &Uri) -> Result<Uri, RewriteError> {
    let path = single_joining_slash(target.path(), inbound.path());
    let query = merge_query(target.query().unwrap_or(""), inbound.query().unwrap_or(""));
    build_uri(target, &path, &query)
}

/// Outbound URI for the alternative backend.
pub fn alternative_uri(alternative: &Url, inbound: &Uri) -> Result<Uri, RewriteError> {
    let path = single_joining_slash(alternative.path(), inbound.path());
    build_uri(alternative, &path, inbound.query().unwrap_or(""))
}

fn build_uri(base: &Url, path: &str, query: &str) -> Result<Uri, RewriteError> {
    let path_and_query = if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    };

    let uri = Uri::builder()
        .scheme(base.scheme().parse::<Scheme>().map_err(axum::http::Error::from)?)
        .authority(authority(base)?.parse::<Authority>().map_err(axum::http::Error::from)?)
        .path_and_query(path_and_query.parse::<PathAndQuery>().map_err(axum::http::Error::from)?)
        .build()?;
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_joining_slash() {
        assert_eq!(single_joining_slash("/a/", "/b"), "/a/b");
        assert_eq!(single_joining_slash("/a", "/b"), "/a/b");
        assert_eq!(single_joining_slash("/a", "b"), "/a/b");
        assert_eq!(single_joining_slash("/a/", "b"), "/a/b");
        assert_eq!(single_joining_slash("", "/foo"), "/foo");
        assert_eq!(single_joining_slash("/", "/foo"), "/foo");
    }

    #[test]
    fn test_merge_query() {
        assert_eq!(merge_query("x=1", "y=2"), "x=1&y=2");
        assert_eq!(merge_query("", "y=2"), "y=2");
        assert_eq!(merge_query("x=1", ""), "x=1");
        assert_eq!(merge_query("", ""), "");
    }

    #[test]
    fn test_target_uri_merges_query() {
        let target = Url::parse("http://primary:8080/base?key=abc").unwrap();
        let inbound: Uri = "/foo?x=1".parse().unwrap();

        let uri = target_uri(&target, &inbound).unwrap();
        assert_eq!(uri.to_string(), "http://primary:8080/base/foo?key=abc&x=1");
    }

    #[test]
    fn test_alternative_uri_keeps_inbound_query() {
        let alternative = Url::parse("http://shadow/alt?ignored=1").unwrap();
        let inbound: Uri = "/foo?x=1".parse().unwrap();

        let uri = alternative_uri(&alternative, &inbound).unwrap();
        assert_eq!(uri.to_string(), "http://shadow/alt/foo?x=1");
    }

    #[test]
    fn test_root_base_path() {
        let target = Url::parse("http://localhost:8080").unwrap();
        let inbound: Uri = "/".parse().unwrap();

        let uri = target_uri(&target, &inbound).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:8080/");
    }

    #[test]
    fn test_missing_host() {
        let base = Url::parse("unix:/run/app.sock").unwrap();
        let inbound: Uri = "/".parse().unwrap();
        assert!(matches!(
            target_uri(&base, &inbound),
            Err(RewriteError::MissingHost(_))
        ));
    }
}
