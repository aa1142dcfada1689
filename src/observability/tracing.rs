//! Request correlation.
//!
//! # Responsibilities
//! - Issue one correlation ID per inbound request
//! - Carry it by value into the shadow task so both halves of a tee log
//!   under the same ID
//!
//! # Design Decisions
//! - UUID v4: unique enough for log joins, no coordination needed
//! - No registry; the ID lives only in the tasks that hold it

use std::fmt;
use uuid::Uuid;

/// Name of the event field the log formatter reads the ID from.
pub const CORRELATION_FIELD: &str = "correlation_id";

/// Opaque per-request token attached to every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new unique correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| CorrelationId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_display_is_hyphenated_uuid() {
        let id = CorrelationId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<Uuid>().unwrap(), *id.as_uuid());
    }
}
