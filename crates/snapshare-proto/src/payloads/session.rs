//! Session payload types: joining, leaving and the participant roster.

use serde::{Deserialize, Serialize};

/// Announce a display name and enter the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    /// Client-chosen display name (not unique, not authenticated)
    pub display_name: String,
}

/// Graceful disconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goodbye {
    /// Optional reason, logged by the server
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

/// One roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Connection handle of the participant
    pub session_id: u64,
    /// Display name
    pub display_name: String,
}

/// Full participant list, in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterUpdate {
    /// Current participants
    pub participants: Vec<RosterEntry>,
}

/// A participant joined the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantJoined {
    /// Connection handle of the joiner
    pub session_id: u64,
    /// Display name
    pub display_name: String,
}

/// A participant left the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLeft {
    /// Connection handle of the departed participant
    pub session_id: u64,
    /// Display name
    pub display_name: String,
}
