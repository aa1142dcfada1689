//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → watch flag set → server stops accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Shadow tasks still running at shutdown are dropped with the runtime

pub mod shutdown;
pub mod signals;

pub use shutdown::{stopped, Shutdown};
