//! Participant presence tracking
//!
//! This module holds the per-participant records kept by the coordinator:
//! - Identity and the default display name
//! - Join order, used to order the presence roster
//! - The last playback position each participant reported

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::messages::{ParticipantId, PresenceEntry};

/// Prefix for server-assigned display names
const GUEST_NAME_PREFIX: &str = "Guest-";

/// Default display name derived from the participant id
pub fn default_display_name(id: &ParticipantId) -> String {
    format!("{}{}", GUEST_NAME_PREFIX, id.short())
}

/// A connected session member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub joined_at: DateTime<Utc>,
    /// Monotonic join sequence number, orders the roster
    #[serde(skip)]
    pub(crate) join_seq: u64,
}

impl Participant {
    /// Create a participant with a fresh id and the default name
    pub fn new(join_seq: u64) -> Self {
        let id = ParticipantId::new();
        Self {
            name: default_display_name(&id),
            id,
            joined_at: Utc::now(),
            join_seq,
        }
    }

    /// Convert to the roster entry sent over the wire
    pub fn to_presence(&self) -> PresenceEntry {
        PresenceEntry {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Last playback position reported by a participant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportedTime {
    /// Position in seconds
    pub seconds: f64,
    /// When the report arrived
    pub reported_at: DateTime<Utc>,
}

impl ReportedTime {
    pub fn now(seconds: f64) -> Self {
        Self {
            seconds,
            reported_at: Utc::now(),
        }
    }
}
