//! `DuskhallServer` builder and accept loop.
//!
//! Ties the layers together: transport → codec → room. The server opens
//! one lobby room at startup and seats every accepted connection in it,
//! which matches how the original service funneled clients — the packet
//! families that would pick rooms (login, channel lists) are outside
//! this protocol's scope.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use duskhall_protocol::PlayerId;
use duskhall_room::{LobbyConfig, RoomId, RoomManager};
use duskhall_transport::TcpTransport;
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::DuskhallError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) lobby_room: RoomId,
    next_guest: AtomicU64,
}

impl ServerState {
    /// Sequential guest identity for a fresh connection. The protocol
    /// has no login exchange, so the server mints the id the client
    /// would otherwise have authenticated with.
    pub(crate) fn next_guest_id(&self) -> PlayerId {
        let n = self.next_guest.fetch_add(1, Ordering::Relaxed);
        // "GUEST" plus up to eight digits stays inside the 13-byte
        // wire field.
        let name = format!("GUEST{}", n % 100_000_000);
        PlayerId::from_text(&name)
            .expect("guest name fits the 13-byte id field")
    }
}

/// Builder for configuring and starting a Duskhall server.
pub struct DuskhallServerBuilder {
    bind_addr: String,
    lobby: LobbyConfig,
}

impl DuskhallServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            lobby: LobbyConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration of the lobby room.
    pub fn lobby(mut self, config: LobbyConfig) -> Self {
        self.lobby = config;
        self
    }

    /// Binds the transport and opens the lobby room.
    pub async fn build(self) -> Result<DuskhallServer, DuskhallError> {
        let transport = TcpTransport::bind(&self.bind_addr).await?;

        let mut rooms = RoomManager::new();
        let lobby_room = rooms.create_room(&self.lobby)?;

        Ok(DuskhallServer {
            transport,
            state: Arc::new(ServerState {
                rooms: Mutex::new(rooms),
                lobby_room,
                next_guest: AtomicU64::new(1),
            }),
        })
    }
}

impl Default for DuskhallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Duskhall lobby server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DuskhallServer {
    transport: TcpTransport,
    state: Arc<ServerState>,
}

impl DuskhallServer {
    pub fn builder() -> DuskhallServerBuilder {
        DuskhallServerBuilder::new()
    }

    /// The bound address (useful when binding to port 0).
    pub fn local_addr(
        &self,
    ) -> Result<std::net::SocketAddr, DuskhallError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop, spawning one handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), DuskhallError> {
        tracing::info!("duskhall server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
