//! Room manager: creates, tracks, and routes players to rooms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use duskhall_protocol::{PlayerId, Request};

use crate::room::spawn_room;
use crate::{
    LobbyConfig, PlayerSender, RequestOutcome, RoomError, RoomHandle,
    RoomId, RoomInfo,
};

/// Counter for generating unique room ids.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Tracks all active rooms and which player sits in which room.
///
/// A player is in at most one room at a time; the manager enforces that
/// here rather than in the actors, which only see their own room.
pub struct RoomManager {
    rooms: HashMap<RoomId, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomId>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
        }
    }

    /// Opens a new room and returns its id.
    pub fn create_room(
        &mut self,
        config: &LobbyConfig,
    ) -> Result<RoomId, RoomError> {
        let room_id =
            RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
        let handle = spawn_room(room_id, config)?;
        self.rooms.insert(room_id, handle);
        tracing::info!(%room_id, name = %config.room_name, "room created");
        Ok(room_id)
    }

    /// Clones the handle for a room. Handles are cheap channel clones;
    /// a caller that shares the manager behind a lock takes the clone
    /// under the lock and talks to the actor with the lock released, so
    /// one room's round trip never stalls every other room.
    pub fn room_handle(
        &self,
        room_id: RoomId,
    ) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(&room_id)
            .cloned()
            .ok_or(RoomError::NotFound(room_id))
    }

    /// Clones the handle for the room a player currently sits in.
    pub fn member_handle(
        &self,
        player_id: &PlayerId,
    ) -> Result<RoomHandle, RoomError> {
        let room_id = self
            .player_rooms
            .get(player_id)
            .copied()
            .ok_or(RoomError::NotInRoom(*player_id))?;
        self.room_handle(room_id)
    }

    /// Records a completed join in the player index.
    pub fn register_member(
        &mut self,
        player_id: PlayerId,
        room_id: RoomId,
    ) {
        self.player_rooms.insert(player_id, room_id);
    }

    /// Applies the membership changes a request produced. An empty room
    /// is removed; its actor has already stopped itself.
    pub fn apply_outcome(
        &mut self,
        room_id: RoomId,
        outcome: &RequestOutcome,
    ) {
        for departed in &outcome.departed {
            self.player_rooms.remove(departed);
        }
        if outcome.room_empty {
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "room closed");
        }
    }

    /// Seats a player in a room, enforcing one room per player.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        room_id: RoomId,
        rank_raw: u32,
        sender: PlayerSender,
    ) -> Result<usize, RoomError> {
        if let Some(current) = self.player_rooms.get(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, *current));
        }
        let handle = self.room_handle(room_id)?;
        let slot = handle.join(player_id, rank_raw, sender).await?;
        self.register_member(player_id, room_id);
        Ok(slot)
    }

    /// Routes a decoded request to the sender's room and applies the
    /// resulting membership changes to the player index.
    pub async fn route_request(
        &mut self,
        player_id: PlayerId,
        request: Request,
    ) -> Result<RequestOutcome, RoomError> {
        let handle = self.member_handle(&player_id)?;
        let outcome = handle.request(player_id, request).await?;
        self.apply_outcome(handle.room_id(), &outcome);
        Ok(outcome)
    }

    /// Treats a dropped connection as a leave: the seat must not stay
    /// occupied by a player who can no longer answer.
    pub async fn disconnect(
        &mut self,
        player_id: PlayerId,
    ) -> Result<RequestOutcome, RoomError> {
        self.route_request(
            player_id,
            Request::Leave {
                requester: player_id,
            },
        )
        .await
    }

    /// Returns info about a specific room.
    pub async fn room_info(
        &self,
        room_id: RoomId,
    ) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        handle.info().await
    }

    /// Shuts a room down and clears every membership pointing at it.
    /// Pending per-room state goes with it; no partial snapshot is sent.
    pub async fn destroy_room(
        &mut self,
        room_id: RoomId,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        let _ = handle.shutdown().await;
        self.player_rooms.retain(|_, rid| *rid != room_id);
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// The room a player currently sits in, if any.
    pub fn player_room(&self, player_id: &PlayerId) -> Option<RoomId> {
        self.player_rooms.get(player_id).copied()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
