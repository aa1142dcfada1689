//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → headers.rs (sanitize shadow clone, strip hop-by-hop on primary)
//!     → outbound transports
//! ```
//!
//! # Design Decisions
//! - No authentication or path restriction: every request is tee'd
//! - Hop-by-hop headers never cross from one connection to another

pub mod headers;
