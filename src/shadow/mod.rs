//! Shadow traffic subsystem.
//!
//! # Data Flow
//! ```text
//! ShadowRequest (from http::request)
//!     → dispatcher.rs (background task per inbound request)
//!     → resilience::timeouts (optional deadline per attempt)
//!     → alternative backend
//!     → response dumped to the log, then discarded
//! ```
//!
//! # Design Decisions
//! - Shadow responses never reach the client
//! - Shadow failures end their own task and nothing else
//! - Task count is unbounded: one per inbound request. Under sustained load
//!   against a slow alternative this grows without limit.

pub mod dispatcher;

pub use dispatcher::{ShadowDispatcher, ShadowOutcome};
