//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound URI (path + query)
//!     → rewrite.rs target_uri      → primary backend
//!     → rewrite.rs alternative_uri → shadow backend
//! ```
//!
//! # Design Decisions
//! - Exactly two destinations, fixed at startup; no route table
//! - Every request goes to both, regardless of method or path

pub mod rewrite;

pub use rewrite::{alternative_uri, merge_query, single_joining_slash, target_uri, RewriteError};
