//! WebSocket message types for the watch session protocol
//!
//! This module defines the message protocol for client-server communication
//! over WebSocket connections. Messages are JSON objects carrying a `type`
//! discriminator, one message per text frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Length of the id prefix used in default display names
const SHORT_ID_LEN: usize = 4;

/// Server-generated participant identity (random 128-bit UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Allocate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short human-readable prefix of the id
    pub fn short(&self) -> String {
        self.0.to_string()[..SHORT_ID_LEN].to_string()
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ParticipantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Messages sent from client to server
///
/// Every payload field is optional so that a message with missing fields
/// still dispatches instead of being rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Chat line for the rest of the room
    #[serde(rename = "chat")]
    Chat {
        #[serde(default, skip_serializing_if = "Value::is_null")]
        text: Value,
    },

    /// Media control action (play, pause, seek, sync...), relayed verbatim
    #[serde(rename = "control")]
    Control {
        #[serde(default, skip_serializing_if = "Value::is_null")]
        action: Value,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        time: Value,
    },

    /// Periodic playback position report, feeds reconciliation only
    #[serde(rename = "timeUpdate")]
    TimeUpdate {
        #[serde(default)]
        time: Value,
    },

    /// Become the host (last writer wins)
    #[serde(rename = "claim-host")]
    ClaimHost,

    /// Give up the host role
    #[serde(rename = "release-host")]
    ReleaseHost,

    /// Any other message type; ignored
    #[serde(other)]
    Unknown,
}

/// Parse a text frame into a client message
///
/// Returns `None` for anything that is not a JSON object with a string
/// `type` field.
pub fn parse_client_message(text: &str) -> Option<ClientMessage> {
    serde_json::from_str(text).ok()
}

/// Coerce a reported playback time into seconds
///
/// Numbers pass through, numeric strings are parsed, `true` counts as 1.
/// Everything else, and any non-finite result, becomes 0.
pub fn coerce_time(value: &Value) -> f64 {
    let time = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };

    if time.is_finite() {
        time
    } else {
        0.0
    }
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent once to a new connection
    #[serde(rename = "welcome")]
    Welcome(WelcomePayload),

    /// A participant joined
    #[serde(rename = "presence-join")]
    PresenceJoin(PresenceEntry),

    /// A participant left
    #[serde(rename = "presence-leave")]
    PresenceLeave(PresenceEntry),

    /// Chat line from another participant
    #[serde(rename = "chat")]
    Chat {
        id: ParticipantId,
        name: String,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        text: Value,
    },

    /// Media control relayed from another participant
    #[serde(rename = "control")]
    Control {
        id: ParticipantId,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        action: Value,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        time: Value,
    },

    /// Host changed (`id` is null when nobody holds the role)
    #[serde(rename = "host-changed")]
    HostChanged(HostChangedPayload),

    /// Periodic playback correction
    #[serde(rename = "time-correction")]
    TimeCorrection(TimeCorrection),
}

// =============================================================================
// Payload Types
// =============================================================================

/// One roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub id: ParticipantId,
    pub name: String,
}

/// Payload for the welcome message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomePayload {
    /// The receiving participant's own id
    pub id: ParticipantId,
    /// The receiving participant's assigned name
    pub name: String,
    /// Every connected participant, the receiver included, in join order
    pub presence: Vec<PresenceEntry>,
}

/// Payload for host-changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostChangedPayload {
    pub id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl HostChangedPayload {
    pub fn held(entry: PresenceEntry) -> Self {
        Self {
            id: Some(entry.id),
            name: Some(entry.name),
        }
    }

    pub fn vacant() -> Self {
        Self {
            id: None,
            name: None,
        }
    }
}

/// Where a correction's target time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionSource {
    Host,
    Median,
}

impl std::fmt::Display for CorrectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrectionSource::Host => write!(f, "host"),
            CorrectionSource::Median => write!(f, "median"),
        }
    }
}

/// Target playback position broadcast by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCorrection {
    /// Whole seconds, floored and clamped to `±(2^53 - 1)`
    pub time: i64,
    pub source: CorrectionSource,
}
