//! TCP transport. The client speaks plain TCP with the 4-byte packet
//! header as the only framing, so this is a thin layer over
//! `tokio::net`: accept sockets, cut the byte stream into frames, write
//! encoded packets back.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;

use crate::{Frame, FrameAssembler, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Monotonic id stamped on each accepted socket, used to correlate a
/// connection's log lines across the reader and writer halves. Not
/// related to any protocol field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listens for incoming client connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }

    /// The bound address (useful when binding to port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }

    /// Waits for and accepts the next incoming connection.
    pub async fn accept(&mut self) -> Result<TcpConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted connection");

        let (read_half, write_half) = stream.into_split();
        Ok(TcpConnection {
            id,
            peer,
            reader: FrameReader {
                id,
                half: read_half,
                assembler: FrameAssembler::new(),
            },
            writer: FrameWriter {
                id,
                half: write_half,
            },
        })
    }
}

/// One accepted client connection.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: FrameReader,
    writer: FrameWriter,
}

impl TcpConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Receives the next complete frame. See [`FrameReader::next_frame`].
    pub async fn next_frame(
        &mut self,
    ) -> Result<Option<Frame>, TransportError> {
        self.reader.next_frame().await
    }

    /// Writes one encoded packet. See [`FrameWriter::send`].
    pub async fn send(
        &mut self,
        packet: Bytes,
    ) -> Result<(), TransportError> {
        self.writer.send(packet).await
    }

    /// Splits into independently owned read and write halves, so a
    /// writer task can drain an outbound queue while the read loop
    /// blocks on the socket.
    pub fn split(self) -> (FrameReader, FrameWriter) {
        (self.reader, self.writer)
    }
}

/// The receiving half: reads raw chunks and reassembles frames.
pub struct FrameReader {
    id: ConnectionId,
    half: OwnedReadHalf,
    assembler: FrameAssembler,
}

impl FrameReader {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the next complete frame, `Ok(None)` on clean close, or an
    /// error if the peer vanished mid-frame or sent an impossible
    /// header.
    pub async fn next_frame(
        &mut self,
    ) -> Result<Option<Frame>, TransportError> {
        loop {
            if let Some(frame) = self.assembler.next_frame()? {
                return Ok(Some(frame));
            }
            let mut chunk = [0u8; 1024];
            let n = self
                .half
                .read(&mut chunk)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                self.assembler.finish()?;
                return Ok(None);
            }
            self.assembler.extend(&chunk[..n]);
        }
    }
}

/// The sending half: writes complete packets to the socket.
pub struct FrameWriter {
    id: ConnectionId,
    half: OwnedWriteHalf,
}

impl FrameWriter {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Writes the whole packet. Packets handed here are already complete
    /// encoded buffers; a partial write surfaces as `SendFailed`.
    pub async fn send(
        &mut self,
        packet: Bytes,
    ) -> Result<(), TransportError> {
        self.half
            .write_all(&packet)
            .await
            .map_err(TransportError::SendFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_count_upward() {
        let first = ConnectionId::next();
        let second = ConnectionId::next();
        assert!(second.0 > first.0);
    }

    #[test]
    fn test_connection_id_names_the_socket_in_logs() {
        assert_eq!(ConnectionId(9).to_string(), "conn-9");
    }
}
