//! Error types for the room layer.

use duskhall_protocol::{EncodeError, PlayerId};

use crate::RoomId;

/// A request that failed validation. The room state is guaranteed
/// untouched: no ack, no snapshot, no partial mutation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A numeric field fell outside its allowed range.
    #[error("{what} {value} out of range")]
    OutOfRange { what: &'static str, value: u32 },

    /// The requester's id matched no occupied seat. Also raised for a
    /// kick aimed at an empty seat, where the id is the all-zero value.
    #[error("no player with id '{0}' in this room")]
    UnknownPlayer(PlayerId),
}

/// A join that could not be seated.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CapacityError {
    /// All four seats are taken.
    #[error("room is full")]
    RoomFull,
}

/// Errors from room operations, across the engine, actor, and manager.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// The room state could not be serialized. Nothing was sent.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The player is already in a room (one room at a time).
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is not in any room.
    #[error("player {0} not in any room")]
    NotInRoom(PlayerId),

    /// The room's command channel is closed or full.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
