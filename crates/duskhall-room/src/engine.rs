//! The lobby room state machine.
//!
//! One engine owns one [`RoomState`] and turns decoded requests into
//! ordered reply packets. It is fully synchronous and deterministic: the
//! actor task wraps it to provide exclusive ownership and delivery, but
//! all semantics live here where they can be unit-tested without a
//! runtime.
//!
//! Every accepted request yields its ack *before* the snapshot it
//! triggered — the client blocks on the ack, and a snapshot arriving
//! first desyncs its lobby screen. The [`Exchange`] and [`LeaveEffect`]
//! structs carry both buffers so the caller cannot reorder them by
//! accident; [`Phase`] guards the assembly window.
//!
//! Duplicate requests are idempotent: the client resends on a timer until
//! the ack lands, so a repeat gets the same ack and an identical snapshot,
//! never an error.

use bytes::Bytes;
use duskhall_protocol::{
    encode_ack, encode_snapshot, AckKind, PlayerId, RankTier, RoomState,
};

use crate::{roster, RoomError, ValidationError};

/// Valid map ids once selected (0 on the wire means "not chosen yet").
pub const MAP_IDS: std::ops::RangeInclusive<u32> = 1..=5;

/// Valid character ids (0 on the wire means "not chosen yet").
pub const CHARACTER_IDS: std::ops::RangeInclusive<u8> = 1..=8;

/// Where the engine stands in assembling a reply.
///
/// Not a multi-tick wait: requests are handled synchronously, so from the
/// outside the engine is always `Idle`. The phase exists to pin the
/// ack-before-snapshot order during assembly and to make re-entrant use a
/// detectable bug rather than a silent reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No reply in flight.
    Idle,
    /// A map select was accepted; its ack must precede the snapshot.
    AwaitingMapAck,
    /// A character select was accepted; its ack must precede the snapshot.
    AwaitingCharacterAck,
}

/// The ordered reply to an accepted request: ack first, snapshot second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Fixed 10-byte acknowledge, queued to the requester first.
    pub ack: Bytes,
    /// Fresh full-room snapshot, broadcast to every occupant after.
    pub snapshot: Bytes,
}

/// The reply to an accepted leave. `snapshot` is `None` when the leaver
/// was the last occupant — the room closes instead of broadcasting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveEffect {
    pub ack: Bytes,
    pub snapshot: Option<Bytes>,
}

/// The reply to an accepted kick, naming the player that was removed so
/// the caller can tear down their membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KickEffect {
    pub kicked: PlayerId,
    pub ack: Bytes,
    pub snapshot: Bytes,
}

/// Chooses the character a select request confirms.
///
/// The request packet is byte-identical regardless of which character the
/// player picked — a confirmed gap in the recovered protocol. The value
/// therefore has to come from outside the wire: this seam is where a
/// future source (a different packet family, a sidecar channel) plugs in.
pub trait SelectionPolicy: Send {
    /// Returns the character id to confirm for the occupant of `slot`.
    /// The engine validates the result against [`CHARACTER_IDS`].
    fn choose(&self, state: &RoomState, slot: usize) -> u8;
}

/// Default policy: keep the character the slot already holds (the value
/// assigned at join), falling back to the lowest unused id if the slot
/// somehow holds an invalid one.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetainAssigned;

impl SelectionPolicy for RetainAssigned {
    fn choose(&self, state: &RoomState, slot: usize) -> u8 {
        let current = state.players[slot].character_id;
        if CHARACTER_IDS.contains(&current) {
            current
        } else {
            roster::lowest_unused_character(&state.players)
        }
    }
}

/// State machine for one lobby room.
pub struct LobbyEngine {
    state: RoomState,
    phase: Phase,
    policy: Box<dyn SelectionPolicy>,
}

impl LobbyEngine {
    /// A fresh room with the default selection policy.
    pub fn new(room_name: [u8; 20]) -> Self {
        Self::with_policy(room_name, Box::new(RetainAssigned))
    }

    pub fn with_policy(
        room_name: [u8; 20],
        policy: Box<dyn SelectionPolicy>,
    ) -> Self {
        Self {
            state: RoomState::new(room_name),
            phase: Phase::Idle,
            policy,
        }
    }

    /// Read access to the authoritative state.
    pub fn state(&self) -> &RoomState {
        &self.state
    }

    /// Current assembly phase. Always [`Phase::Idle`] between calls.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Seats a player: lowest free slot, lowest unused character, not
    /// ready. Returns the slot index and the snapshot to broadcast.
    ///
    /// Joining is driven by the membership layer, not by a wire packet,
    /// so there is no ack. A repeat join by a seated player is
    /// idempotent: same seat, fresh snapshot.
    pub fn join(
        &mut self,
        player_id: PlayerId,
        rank_raw: u32,
    ) -> Result<(usize, Bytes), RoomError> {
        if let Some(slot) = roster::resolve(&self.state.players, &player_id)
        {
            return Ok((slot, encode_snapshot(&self.state)?));
        }
        let slot = roster::first_free(&self.state.players)
            .ok_or(crate::CapacityError::RoomFull)?;

        self.state.players[slot].player_id = player_id;
        let character =
            roster::lowest_unused_character(&self.state.players);
        let seat = &mut self.state.players[slot];
        seat.character_id = character;
        seat.status_byte = 0;
        seat.rank_raw = rank_raw;

        tracing::info!(
            player = %player_id,
            slot,
            character = self.state.players[slot].character_id,
            rank = %RankTier::from_raw(rank_raw),
            "player seated"
        );
        Ok((slot, encode_snapshot(&self.state)?))
    }

    /// Leader picked a map. Out-of-range values are rejected with the
    /// state untouched; re-selecting the current map is idempotent.
    pub fn map_select(&mut self, map: u32) -> Result<Exchange, RoomError> {
        debug_assert_eq!(self.phase, Phase::Idle);
        if !MAP_IDS.contains(&map) {
            return Err(ValidationError::OutOfRange {
                what: "map id",
                value: map,
            }
            .into());
        }
        self.phase = Phase::AwaitingMapAck;
        self.state.selected_map = map;
        tracing::debug!(map, "map selected");
        self.finish(AckKind::MapSelect)
    }

    /// A player confirmed a character; the chosen id comes from the
    /// engine's [`SelectionPolicy`] since the packet doesn't carry it.
    pub fn character_select(
        &mut self,
        requester: PlayerId,
    ) -> Result<Exchange, RoomError> {
        let slot = self.resolve(&requester)?;
        let character = self.policy.choose(&self.state, slot);
        self.character_select_as(requester, character)
    }

    /// Character select with an explicitly supplied character id.
    pub fn character_select_as(
        &mut self,
        requester: PlayerId,
        character: u8,
    ) -> Result<Exchange, RoomError> {
        debug_assert_eq!(self.phase, Phase::Idle);
        let slot = self.resolve(&requester)?;
        if !CHARACTER_IDS.contains(&character) {
            return Err(ValidationError::OutOfRange {
                what: "character id",
                value: character as u32,
            }
            .into());
        }
        self.phase = Phase::AwaitingCharacterAck;
        self.state.players[slot].character_id = character;
        tracing::debug!(player = %requester, slot, character, "character confirmed");
        self.finish(AckKind::CharacterSelect)
    }

    /// Flips the requester's ready flag. Only bit 0 toggles; any other
    /// status bits the client set are preserved.
    pub fn ready_toggle(
        &mut self,
        requester: PlayerId,
    ) -> Result<Exchange, RoomError> {
        let slot = self.resolve(&requester)?;
        self.state.players[slot].status_byte ^= 1;
        tracing::debug!(
            player = %requester,
            slot,
            ready = self.state.players[slot].status_byte & 1,
            "ready toggled"
        );
        self.finish(AckKind::ReadyToggle)
    }

    /// Removes the requester. Leadership falls to the lowest occupied
    /// seat if the leader left; a now-empty room yields no snapshot and
    /// should be closed by the caller.
    pub fn leave(
        &mut self,
        requester: PlayerId,
    ) -> Result<LeaveEffect, RoomError> {
        let slot = self.resolve(&requester)?;
        self.vacate(slot);
        tracing::info!(player = %requester, slot, "player left");

        let ack = encode_ack(AckKind::Leave);
        let snapshot = if self.state.occupied() == 0 {
            None
        } else {
            Some(encode_snapshot(&self.state)?)
        };
        Ok(LeaveEffect { ack, snapshot })
    }

    /// Removes the occupant of `slot`. Whether the requester may kick is
    /// the caller's policy; the engine only validates the target.
    pub fn kick(&mut self, slot: u32) -> Result<KickEffect, RoomError> {
        let index = slot as usize;
        if index >= self.state.players.len() {
            return Err(ValidationError::OutOfRange {
                what: "slot index",
                value: slot,
            }
            .into());
        }
        let kicked = self.state.players[index].player_id;
        if kicked.is_empty() {
            return Err(ValidationError::UnknownPlayer(kicked).into());
        }
        self.vacate(index);
        tracing::info!(player = %kicked, slot = index, "player kicked");
        Ok(KickEffect {
            kicked,
            ack: encode_ack(AckKind::Kick),
            snapshot: encode_snapshot(&self.state)?,
        })
    }

    fn resolve(
        &self,
        player_id: &PlayerId,
    ) -> Result<usize, ValidationError> {
        roster::resolve(&self.state.players, player_id)
            .ok_or(ValidationError::UnknownPlayer(*player_id))
    }

    fn vacate(&mut self, slot: usize) {
        self.state.players[slot].clear();
        if self.state.leader_slot as usize == slot {
            let next = roster::lowest_occupied(&self.state.players)
                .unwrap_or(0);
            self.state.leader_slot = next as u8;
        }
    }

    /// Assembles the ack-then-snapshot pair and returns to `Idle`.
    fn finish(&mut self, kind: AckKind) -> Result<Exchange, RoomError> {
        let result = encode_snapshot(&self.state)
            .map(|snapshot| Exchange {
                ack: encode_ack(kind),
                snapshot,
            })
            .map_err(RoomError::from);
        self.phase = Phase::Idle;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CapacityError;
    use duskhall_protocol::decode_snapshot;

    fn engine() -> LobbyEngine {
        LobbyEngine::new(RoomState::name_from_text("TestRoom1").unwrap())
    }

    fn id(name: &str) -> PlayerId {
        PlayerId::from_text(name).unwrap()
    }

    fn full_engine() -> LobbyEngine {
        let mut e = engine();
        for name in ["BABA", "JEREMY", "DJANGO", "FANOUI"] {
            e.join(id(name), 0).unwrap();
        }
        e
    }

    #[test]
    fn test_join_assigns_lowest_free_slot_and_character() {
        let mut e = engine();
        let (slot, _) = e.join(id("BABA"), 0x01).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(e.state().players[0].character_id, 1);

        let (slot, _) = e.join(id("JEREMY"), 0).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(e.state().players[1].character_id, 2);
        assert_eq!(e.state().players[1].status_byte, 0);
        assert_eq!(e.state().leader_slot, 0);
    }

    #[test]
    fn test_join_full_room_rejected() {
        let mut e = full_engine();
        let err = e.join(id("FIFTH"), 0).unwrap_err();
        assert!(matches!(
            err,
            RoomError::Capacity(CapacityError::RoomFull)
        ));
        assert_eq!(e.state().occupied(), 4);
    }

    #[test]
    fn test_join_repeat_is_idempotent() {
        let mut e = engine();
        let (slot, _) = e.join(id("BABA"), 0).unwrap();
        let (again, _) = e.join(id("BABA"), 0).unwrap();
        assert_eq!(slot, again);
        assert_eq!(e.state().occupied(), 1);
    }

    #[test]
    fn test_join_reuses_vacated_character() {
        let mut e = full_engine();
        e.leave(id("JEREMY")).unwrap();
        let (slot, _) = e.join(id("NEWBIE"), 0).unwrap();
        assert_eq!(slot, 1);
        // JEREMY held character 2; the newcomer gets the lowest free id.
        assert_eq!(e.state().players[1].character_id, 2);
    }

    #[test]
    fn test_map_select_sets_map_and_produces_ordered_reply() {
        let mut e = full_engine();
        let exchange = e.map_select(3).unwrap();
        assert_eq!(e.state().selected_map, 3);
        assert_eq!(e.phase(), Phase::Idle);

        // Ack is the fixed map-select template.
        assert_eq!(exchange.ack[..2], [0xc6, 0x0b]);
        // Snapshot reflects the new map.
        let decoded = decode_snapshot(&exchange.snapshot).unwrap();
        assert_eq!(decoded.selected_map, 3);
    }

    #[test]
    fn test_map_select_rejects_out_of_range() {
        let mut e = full_engine();
        let before = *e.state();
        for bad in [0u32, 6, 0xffff_ffff] {
            let err = e.map_select(bad).unwrap_err();
            assert!(matches!(
                err,
                RoomError::Validation(ValidationError::OutOfRange { .. })
            ));
        }
        // Rejection leaves the state untouched.
        assert_eq!(*e.state(), before);
    }

    #[test]
    fn test_map_select_duplicate_is_idempotent() {
        let mut e = full_engine();
        let first = e.map_select(2).unwrap();
        let second = e.map_select(2).unwrap();
        assert_eq!(first, second);
        assert_eq!(e.state().selected_map, 2);
    }

    #[test]
    fn test_character_select_confirms_assigned_character() {
        let mut e = full_engine();
        // DJANGO sat third, so join assigned character 3.
        let exchange = e.character_select(id("DJANGO")).unwrap();
        assert_eq!(e.state().players[2].character_id, 3);
        assert_eq!(exchange.ack[..2], [0xc5, 0x0b]);

        // The resend the client fires while waiting is idempotent.
        let again = e.character_select(id("DJANGO")).unwrap();
        assert_eq!(exchange, again);
    }

    #[test]
    fn test_character_select_unknown_player_rejected() {
        let mut e = full_engine();
        let before = *e.state();
        let err = e.character_select(id("GHOST")).unwrap_err();
        assert!(matches!(
            err,
            RoomError::Validation(ValidationError::UnknownPlayer(_))
        ));
        assert_eq!(*e.state(), before);
    }

    #[test]
    fn test_character_select_as_rejects_out_of_range() {
        let mut e = full_engine();
        for bad in [0u8, 9] {
            let err =
                e.character_select_as(id("BABA"), bad).unwrap_err();
            assert!(matches!(
                err,
                RoomError::Validation(ValidationError::OutOfRange { .. })
            ));
        }
        assert_eq!(e.state().players[0].character_id, 1);
    }

    #[test]
    fn test_ready_toggle_flips_and_reflips() {
        let mut e = full_engine();
        e.ready_toggle(id("FANOUI")).unwrap();
        assert_eq!(e.state().players[3].status_byte, 1);
        e.ready_toggle(id("FANOUI")).unwrap();
        assert_eq!(e.state().players[3].status_byte, 0);
    }

    #[test]
    fn test_ready_toggle_preserves_high_status_bits() {
        let mut e = full_engine();
        // Force an observed-but-unexplained high bit; only bit 0 toggles.
        e.state.players[0].status_byte = 0x82;
        let exchange = e.ready_toggle(id("BABA")).unwrap();
        let decoded = decode_snapshot(&exchange.snapshot).unwrap();
        assert_eq!(decoded.players[0].status_byte, 0x83);
    }

    #[test]
    fn test_leave_reassigns_leader_to_lowest_occupied() {
        let mut e = full_engine();
        let effect = e.leave(id("BABA")).unwrap();
        assert_eq!(e.state().leader_slot, 1);
        assert!(e.state().players[0].is_empty());
        let snapshot = effect.snapshot.expect("room still occupied");
        assert_eq!(decode_snapshot(&snapshot).unwrap().leader_slot, 1);
    }

    #[test]
    fn test_leave_last_player_closes_room() {
        let mut e = engine();
        e.join(id("BABA"), 0).unwrap();
        let effect = e.leave(id("BABA")).unwrap();
        assert_eq!(effect.snapshot, None);
        assert_eq!(e.state().occupied(), 0);
    }

    #[test]
    fn test_leave_unknown_player_rejected() {
        let mut e = full_engine();
        assert!(e.leave(id("GHOST")).is_err());
        assert_eq!(e.state().occupied(), 4);
    }

    #[test]
    fn test_kick_removes_target() {
        let mut e = full_engine();
        let effect = e.kick(2).unwrap();
        assert_eq!(effect.kicked, id("DJANGO"));
        assert!(e.state().players[2].is_empty());
        assert_eq!(effect.ack[..2], [0xc3, 0x0b]);
    }

    #[test]
    fn test_kick_empty_slot_rejected() {
        let mut e = engine();
        e.join(id("BABA"), 0).unwrap();
        let err = e.kick(3).unwrap_err();
        assert!(matches!(
            err,
            RoomError::Validation(ValidationError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn test_kick_out_of_range_slot_rejected() {
        let mut e = full_engine();
        let err = e.kick(4).unwrap_err();
        assert!(matches!(
            err,
            RoomError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_snapshot_reflects_single_consistent_instant() {
        let mut e = full_engine();
        let exchange = e.map_select(5).unwrap();
        // The snapshot in the reply equals a re-encode of the state
        // after the mutation, not a mix of before/after fields.
        assert_eq!(
            decode_snapshot(&exchange.snapshot).unwrap(),
            *e.state()
        );
    }
}
