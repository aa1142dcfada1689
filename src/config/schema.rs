//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root configuration for the tee proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TeeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Primary and shadow base URLs.
    pub hosts: HostsConfig,

    /// Shadow retry configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,
}

impl ListenerConfig {
    /// Address handed to the listener. A bare `:port` binds every interface.
    pub fn bind_target(&self) -> String {
        if self.bind_address.starts_with(':') {
            format!("0.0.0.0{}", self.bind_address)
        } else {
            self.bind_address.clone()
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
        }
    }
}

/// Backend base URLs every inbound request is rewritten against.
///
/// Read-only after startup; shared between the primary path and every
/// shadow task.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostsConfig {
    /// Where production traffic goes. Its responses reach the client.
    pub target: Url,

    /// Where shadow traffic goes. Responses are logged and discarded.
    pub alternative: Url,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            target: Url::parse("http://localhost:8080").expect("static url"),
            alternative: Url::parse("http://localhost:8081").expect("static url"),
        }
    }
}

/// Retry configuration for the shadow path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per shadow request (first call included).
    pub max_attempts: u32,

    /// Constant delay between attempts in milliseconds.
    pub interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per round trip deadline in milliseconds (0 disables it).
    /// Covers the wait for response headers, not body streaming.
    pub round_trip_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { round_trip_ms: 2000 }
    }
}

impl TimeoutConfig {
    pub fn round_trip(&self) -> Option<Duration> {
        (self.round_trip_ms > 0).then(|| Duration::from_millis(self.round_trip_ms))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Debug logging for the proxy and its HTTP middleware.
    pub verbose: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            verbose: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
