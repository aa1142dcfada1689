//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (every round trip races its deadline)
//!     → On shadow 5xx: retries.rs (retry after a fixed interval, bounded)
//! ```
//!
//! # Design Decisions
//! - Timeouts apply to both paths when configured
//! - Retries exist on the shadow path only; the primary passes 5xx through
//! - All resilience logic composes around the `RoundTrip` seam

pub mod retries;
pub mod timeouts;

pub use retries::{RetryDecision, RetryPolicy};
pub use timeouts::TimeoutTransport;
