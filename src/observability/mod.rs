//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → tracing.rs (correlation ID issued)
//!     → primary path and shadow task both log with that ID
//!     → logging.rs (one escaped line per event on stdout)
//!     → metrics.rs (counters, histograms; optional exporter)
//! ```
//!
//! # Design Decisions
//! - Correlation ID flows by value, never through global state
//! - Log lines are atomic and self-contained
//! - Metrics are cheap and disabled by default

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::tracing::CorrelationId;
