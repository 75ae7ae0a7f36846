//! Error types for the protocol layer.
//!
//! Each crate in Duskhall defines its own error enum. A `DecodeError`
//! always means a malformed inbound buffer; an `EncodeError` always means
//! a state value that cannot be represented in the fixed wire layout.
//! Neither is ever swallowed: a packet the codec can't account for is a
//! packet the client will interpret differently than we do.

/// Errors raised while decoding an inbound packet.
///
/// Id and length are validated before any payload field is interpreted;
/// a mismatch is a decode failure, never a best-effort parse.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The leading two bytes don't name a packet we handle, or don't
    /// match the kind the caller expected.
    #[error("bad packet id {found:#06x}")]
    BadPacketId { found: u16 },

    /// The buffer length doesn't match the fixed size for this packet
    /// kind. Covers both truncated buffers and lying length fields.
    #[error("bad length for packet {id:#06x}: expected {expected}, got {found}")]
    BadLength {
        id: u16,
        expected: usize,
        found: usize,
    },
}

/// Errors raised while encoding outbound state.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    /// A field would overflow its fixed wire width. The packet is not
    /// produced at all — a truncated identifier would silently corrupt
    /// the client's player list.
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}
