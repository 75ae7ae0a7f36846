//! Unified error type for the Duskhall server.

use duskhall_protocol::DecodeError;
use duskhall_room::RoomError;
use duskhall_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DuskhallError {
    /// A transport-level error (accept, send, recv, framing).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A malformed inbound packet.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A room-level error (validation, capacity, membership).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskhall_room::ValidationError;

    #[test]
    fn test_from_decode_error() {
        let err = DecodeError::BadPacketId { found: 0x1234 };
        let top: DuskhallError = err.into();
        assert!(matches!(top, DuskhallError::Decode(_)));
        assert!(top.to_string().contains("0x1234"));
    }

    #[test]
    fn test_from_room_error() {
        let err: RoomError = ValidationError::OutOfRange {
            what: "map id",
            value: 9,
        }
        .into();
        let top: DuskhallError = err.into();
        assert!(matches!(top, DuskhallError::Room(_)));
        assert!(top.to_string().contains("map id 9"));
    }
}
