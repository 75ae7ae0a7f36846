//! Room identifiers and configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-side room identifier. Never appears on the wire — the client
/// addresses rooms implicitly through its connection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

/// Configuration for one lobby room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Room name as text. Must fit the 20-byte wire field; room creation
    /// fails otherwise.
    pub room_name: String,

    /// Command channel depth for the room actor. Senders wait when full.
    pub command_channel_size: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            room_name: "Lobby".to_string(),
            command_channel_size: 64,
        }
    }
}
