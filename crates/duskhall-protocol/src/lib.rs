//! Wire protocol for Duskhall.
//!
//! This crate defines the "language" spoken between the unmodified game
//! client and the reconstructed server:
//!
//! - **Types** ([`RoomState`], [`PlayerSlot`], [`Request`], [`AckKind`]) —
//!   the typed form of every packet in the lobby-room family.
//! - **Codec** ([`encode_snapshot`], [`decode_request`], [`encode_ack`]) —
//!   byte-exact translation between those types and wire buffers.
//! - **Errors** ([`EncodeError`], [`DecodeError`]) — what can go wrong
//!   during encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw framed bytes) and the
//! room engine (authoritative state). It doesn't know about connections
//! or rooms — it only knows how to serialize and deserialize packets.
//!
//! ```text
//! Transport (framed bytes) → Protocol (Request) → Room engine
//! Room engine → Protocol (snapshot/ack bytes) → Transport
//! ```
//!
//! The format is not negotiable: it was recovered from packet captures and
//! the decompiled client, and the client hangs if a single offset is off.
//! That is why this crate is hand-written fixed-offset binary rather than a
//! serde codec — every field width and padding byte is load-bearing.

mod codec;
mod error;
mod types;

pub use codec::{
    decode_request, decode_snapshot, encode_ack, encode_snapshot, wire,
};
pub use error::{DecodeError, EncodeError};
pub use types::{
    AckKind, PlayerId, PlayerSlot, RankTier, Request, RoomState,
    MAX_PLAYERS,
};
