//! Transport layer for Duskhall: plain TCP plus packet framing.
//!
//! The PS2 client speaks raw TCP; each packet is delimited only by its
//! own 4-byte header. This crate owns the two concerns below the
//! protocol codec:
//!
//! - [`FrameAssembler`] / [`Frame`] — cutting the byte stream into
//!   complete packets regardless of how TCP fragments it
//! - [`TcpTransport`] / [`TcpConnection`] — accepting sockets and moving
//!   frames in arrival order
//!
//! Nothing here interprets packet contents; malformed-but-well-framed
//! packets travel upward and die in the codec.

mod error;
mod frame;
mod tcp;

pub use error::TransportError;
pub use frame::{
    Frame, FrameAssembler, FrameError, HEADER_LEN, MAX_PAYLOAD_LEN,
};
pub use tcp::{
    ConnectionId, FrameReader, FrameWriter, TcpConnection, TcpTransport,
};
