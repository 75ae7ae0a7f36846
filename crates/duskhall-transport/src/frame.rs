//! Packet framing over the TCP byte stream.
//!
//! The client writes packets back to back with no delimiter beyond the
//! header itself: 2 bytes of packet id, 2 bytes of payload length
//! (little-endian, header excluded), then exactly that many payload
//! bytes. TCP is free to split or merge those writes, so the assembler
//! buffers incoming chunks and cuts complete frames as they fill in.
//!
//! The assembler does not interpret packet ids. Whether `0x07de` means
//! anything is the codec's concern; the only thing rejected here is a
//! length field larger than any packet in the protocol could be.

use bytes::{Buf, Bytes, BytesMut};

/// Header size: packet id (u16) + payload length (u16).
pub const HEADER_LEN: usize = 4;

/// Ceiling on the payload length field. The largest real packet carries
/// 156 bytes; anything near the cap is a corrupt stream or a wrong peer,
/// and buffering it would let a bad header demand unbounded memory.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// Errors raised while cutting frames from the byte stream.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// A header announced a payload longer than the protocol allows.
    #[error("payload length {len} exceeds maximum {max}")]
    OversizedPayload { len: usize, max: usize },

    /// The stream ended in the middle of a frame.
    #[error("stream ended mid-frame with {residual} buffered bytes")]
    Truncated { residual: usize },
}

/// One complete packet as read off the wire: parsed id plus the full
/// buffer (header included), ready for the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_id: u16,
    pub bytes: Bytes,
}

impl Frame {
    /// Payload view (everything after the header).
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }
}

/// Reassembles frames from arbitrarily fragmented reads.
///
/// Feed raw chunks with [`extend`](Self::extend), then drain complete
/// frames with [`next_frame`](Self::next_frame) until it returns
/// `Ok(None)`. Call [`finish`](Self::finish) at end of stream to detect
/// a connection cut mid-frame.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes from the stream.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Cuts the next complete frame, or `Ok(None)` if more bytes are
    /// needed. A frame is only returned whole; partial data stays
    /// buffered.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let packet_id = u16::from_le_bytes([self.buf[0], self.buf[1]]);
        let payload_len =
            u16::from_le_bytes([self.buf[2], self.buf[3]]) as usize;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(FrameError::OversizedPayload {
                len: payload_len,
                max: MAX_PAYLOAD_LEN,
            });
        }
        let total = HEADER_LEN + payload_len;
        if self.buf.len() < total {
            return Ok(None);
        }
        let bytes = self.buf.split_to(total).freeze();
        Ok(Some(Frame { packet_id, bytes }))
    }

    /// Declares end of stream. Leftover bytes mean the peer was cut off
    /// mid-frame.
    pub fn finish(&self) -> Result<(), FrameError> {
        if self.buf.has_remaining() {
            return Err(FrameError::Truncated {
                residual: self.buf.len(),
            });
        }
        Ok(())
    }
}
