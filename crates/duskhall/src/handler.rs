//! Per-connection handler: seating, the read loop, and the writer task.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Mint a guest identity and seat it in the lobby room
//!   2. Spawn a writer task draining the player's outbound channel
//!   3. Loop: frame → decode → route to the room actor
//!
//! The room actor pushes ack and snapshot into the outbound channel in
//! order, and the writer task drains that channel to the socket in
//! order, so the client's required ack-before-snapshot sequence holds
//! end to end without any coordination here.
//!
//! A packet that fails to decode is dropped and logged; the connection
//! lives on. A request the room rejects leaves state untouched and is
//! likewise non-fatal. Only transport failure or departure (leave,
//! kick) ends the loop.

use std::sync::Arc;

use duskhall_protocol::{decode_request, PlayerId, Request};
use duskhall_room::{RoomError, RoomHandle};
use duskhall_transport::TcpConnection;
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::DuskhallError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: TcpConnection,
    state: Arc<ServerState>,
) -> Result<(), DuskhallError> {
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    let (mut reader, mut writer) = conn.split();

    let player_id = state.next_guest_id();
    tracing::info!(%conn_id, %peer, player = %player_id, "connection opened");

    // The manager lock guards only the room index, never an actor round
    // trip: take a handle clone under the lock, talk to the actor with
    // the lock released, re-lock to record the result. Rooms stay
    // independent units of concurrency this way.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = {
        let rooms = state.rooms.lock().await;
        rooms.room_handle(state.lobby_room)?
    };
    handle.join(player_id, 0, tx).await?;
    state
        .rooms
        .lock()
        .await
        .register_member(player_id, handle.room_id());

    // Drains the outbound channel to the socket. Ends when the room
    // drops the sender (departure) or the socket dies.
    let writer_task = tokio::spawn(async move {
        while let Some(packet) = rx.recv().await {
            if let Err(e) = writer.send(packet).await {
                tracing::debug!(error = %e, "outbound write failed");
                break;
            }
        }
    });

    let result = read_loop(&mut reader, &state, &handle, player_id).await;

    // The seat must not outlive the connection. A normal leave or kick
    // already cleared it; everything else is treated as a disconnect.
    let still_member = {
        let rooms = state.rooms.lock().await;
        rooms.player_room(&player_id).is_some()
    };
    if still_member {
        let leave = Request::Leave {
            requester: player_id,
        };
        match handle.request(player_id, leave).await {
            Ok(outcome) => {
                let mut rooms = state.rooms.lock().await;
                rooms.apply_outcome(handle.room_id(), &outcome);
            }
            Err(e) => {
                tracing::debug!(
                    player = %player_id,
                    error = %e,
                    "disconnect cleanup failed"
                );
            }
        }
    }

    // Let the writer flush whatever the room queued last (the leave
    // ack, the final snapshot) before the socket drops.
    let _ = writer_task.await;
    tracing::info!(%conn_id, player = %player_id, "connection closed");
    result
}

/// Reads frames until departure, clean close, or transport failure.
async fn read_loop(
    reader: &mut duskhall_transport::FrameReader,
    state: &Arc<ServerState>,
    handle: &RoomHandle,
    player_id: PlayerId,
) -> Result<(), DuskhallError> {
    loop {
        let frame = match reader.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(player = %player_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(player = %player_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let request = match decode_request(&frame.bytes) {
            Ok(request) => request,
            Err(e) => {
                // Fatal for this packet only.
                tracing::warn!(
                    player = %player_id,
                    packet_id = frame.packet_id,
                    error = %e,
                    "dropping malformed packet"
                );
                continue;
            }
        };

        // The actor round trip runs without the manager lock; the lock
        // is re-taken only to sync the membership index afterwards.
        match handle.request(player_id, request).await {
            Ok(outcome) => {
                let mut rooms = state.rooms.lock().await;
                rooms.apply_outcome(handle.room_id(), &outcome);
                drop(rooms);
                if outcome.departed.contains(&player_id) {
                    tracing::debug!(player = %player_id, "departed room");
                    return Ok(());
                }
            }
            Err(RoomError::Validation(e)) => {
                // Rejected request: no ack, no snapshot, state intact.
                tracing::debug!(player = %player_id, error = %e, "request rejected");
                // A kicked player's seat is already gone; their next
                // request is rejected and the connection winds down.
                let rooms = state.rooms.lock().await;
                if rooms.player_room(&player_id).is_none() {
                    return Ok(());
                }
            }
            Err(e) => {
                tracing::debug!(player = %player_id, error = %e, "room error");
                return Err(e.into());
            }
        }
    }
}
