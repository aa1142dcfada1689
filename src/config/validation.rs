//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the listen address and both backend URLs are usable
//! - Validate value ranges (at least one attempt)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TeeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::{Host, Url};

use crate::config::schema::TeeConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a host:port address")]
    BindAddress(String),

    #[error("hosts.{field} '{url}' must use the http scheme")]
    UnsupportedScheme { field: &'static str, url: String },

    #[error("hosts.{field} '{url}' has no host")]
    MissingHost { field: &'static str, url: String },

    #[error("retries.max_attempts must be at least 1")]
    NoAttempts,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &TeeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_listen_address(&config.listener.bind_target()) {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    check_backend("target", &config.hosts.target, &mut errors);
    check_backend("alternative", &config.hosts.alternative, &mut errors);

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::NoAttempts);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `ip:port`, `[ipv6]:port` or `hostname:port`. Names are not resolved here;
/// the listener does that when it binds.
fn is_listen_address(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => port.parse::<u16>().is_ok() && Host::parse(host).is_ok(),
        None => false,
    }
}

fn check_backend(field: &'static str, url: &Url, errors: &mut Vec<ValidationError>) {
    // The outbound connector is plain HTTP only.
    if url.scheme() != "http" {
        errors.push(ValidationError::UnsupportedScheme {
            field,
            url: url.to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        errors.push(ValidationError::MissingHost {
            field,
            url: url.to_string(),
        });
    }
}
