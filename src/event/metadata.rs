//! Event metadata for tracking and correlation.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// How an event entered the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Queued through `fire`
    Fire,
    /// Dispatched inline through `send`
    Send,
    /// Queued by a scheduler timer
    Schedule,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Fire => f.write_str("fire"),
            Origin::Send => f.write_str("send"),
            Origin::Schedule => f.write_str("schedule"),
        }
    }
}

/// Metadata attached to every published event.
///
/// Handlers never see it; it exists so that log lines emitted on the
/// publishing side and inside workers can be correlated.
#[derive(Debug, Clone)]
pub struct EventMetadata {
    /// Unique identifier for this event instance
    pub event_id: Uuid,

    /// Timestamp when the event was published
    pub timestamp: DateTime<Utc>,

    /// Publishing path
    pub origin: Origin,
}

impl EventMetadata {
    /// Create new metadata with a generated event ID and the current timestamp
    pub fn new(origin: Origin) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            origin,
        }
    }
}
