//! Byte-exact encode/decode for the lobby-room packet family.
//!
//! Everything here is pure: bytes in, typed values out, and back. No I/O,
//! no logging, no state. The layouts are fixed-offset records recovered
//! from captures and the decompiled client parser; the [`wire`] module is
//! the single place those numbers live.
//!
//! Two conventions hold for every packet:
//!
//! - multi-byte integers are little-endian;
//! - the header is 2 bytes of packet id followed by 2 bytes of **payload**
//!   length (the byte count after the 4-byte header). Observed on every
//!   capture: map request `de07 0400`, character request `dc07 0d00`,
//!   acks `c60b 0600` / `c50b 0600`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    AckKind, DecodeError, EncodeError, PlayerId, PlayerSlot, Request,
    RoomState, MAX_PLAYERS,
};

/// Wire-level constants: packet ids, payload sizes, field offsets.
///
/// Offsets are relative to the payload start (byte 4 of the packet).
pub mod wire {
    /// Packet header: 2-byte id + 2-byte payload length.
    pub const HEADER_LEN: usize = 4;

    /// Room snapshot, server → client.
    pub const ID_SNAPSHOT: u16 = 0x03ee;
    /// Ready toggle request, client → server.
    pub const ID_READY_TOGGLE_REQUEST: u16 = 0x07d9;
    /// Leave request, client → server.
    pub const ID_LEAVE_REQUEST: u16 = 0x07da;
    /// Kick request, client → server.
    pub const ID_KICK_REQUEST: u16 = 0x07db;
    /// Character select request, client → server.
    pub const ID_CHARACTER_SELECT_REQUEST: u16 = 0x07dc;
    /// Map select request, client → server.
    pub const ID_MAP_SELECT_REQUEST: u16 = 0x07de;
    /// Acknowledge ids, server → client.
    pub const ID_READY_TOGGLE_ACK: u16 = 0x0bc1;
    pub const ID_LEAVE_ACK: u16 = 0x0bc2;
    pub const ID_KICK_ACK: u16 = 0x0bc3;
    pub const ID_CHARACTER_SELECT_ACK: u16 = 0x0bc5;
    pub const ID_MAP_SELECT_ACK: u16 = 0x0bc6;

    /// Snapshot payload: leader byte + pad, 20-byte name, 11-byte opaque
    /// block, pad, four player blocks, map word, flag word.
    pub const SNAPSHOT_PAYLOAD_LEN: usize = 156;
    pub const ROOM_NAME_OFFSET: usize = 4;
    pub const ROOM_NAME_LEN: usize = 20;
    pub const UNKNOWN_A_OFFSET: usize = 24;
    pub const UNKNOWN_A_LEN: usize = 11;
    /// First player block. The client parser walks 28-byte strides from
    /// exactly this payload offset.
    pub const PLAYER_BLOCKS_OFFSET: usize = 36;
    pub const PLAYER_BLOCK_LEN: usize = 28;
    /// Map and flag words. The client also reads each as a u16 at the
    /// same offset (its map-select gate and waiting-room gate); those
    /// reads are views of these words, not separate fields.
    pub const SELECTED_MAP_OFFSET: usize = 148;
    pub const SELECT_FLAG_OFFSET: usize = 152;

    /// Id field width inside player blocks and select requests. The
    /// logical identifier is 16 bytes; only 13 travel on the wire.
    pub const PLAYER_ID_WIRE_LEN: usize = 13;

    /// Request payload sizes (fixed per kind).
    pub const MAP_SELECT_PAYLOAD_LEN: usize = 4;
    pub const KICK_PAYLOAD_LEN: usize = 4;
    pub const ID_CARRYING_PAYLOAD_LEN: usize = PLAYER_ID_WIRE_LEN;

    /// Every ack: 6-byte payload, constant success template.
    pub const ACK_PAYLOAD_LEN: usize = 6;
    pub const ACK_PAYLOAD: [u8; ACK_PAYLOAD_LEN] =
        [0x01, 0x00, 0x00, 0x00, 0x01, 0x00];
}

// ---------------------------------------------------------------------------
// Header helpers
// ---------------------------------------------------------------------------

fn put_header(buf: &mut BytesMut, id: u16, payload_len: usize) {
    buf.put_u16_le(id);
    buf.put_u16_le(payload_len as u16);
}

/// Splits a packet into (id, payload), checking the header against the
/// buffer before any field is interpreted.
fn split_packet(buf: &[u8]) -> Result<(u16, &[u8]), DecodeError> {
    if buf.len() < wire::HEADER_LEN {
        return Err(DecodeError::BadLength {
            id: 0,
            expected: wire::HEADER_LEN,
            found: buf.len(),
        });
    }
    let id = u16::from_le_bytes([buf[0], buf[1]]);
    let payload_len = u16::from_le_bytes([buf[2], buf[3]]) as usize;
    let payload = &buf[wire::HEADER_LEN..];
    if payload.len() != payload_len {
        return Err(DecodeError::BadLength {
            id,
            expected: payload_len,
            found: payload.len(),
        });
    }
    Ok((id, payload))
}

fn expect_payload_len(
    id: u16,
    payload: &[u8],
    expected: usize,
) -> Result<(), DecodeError> {
    if payload.len() != expected {
        return Err(DecodeError::BadLength {
            id,
            expected,
            found: payload.len(),
        });
    }
    Ok(())
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Encodes the full `0x03ee` room snapshot for a state that existed at a
/// single consistent instant.
///
/// # Errors
///
/// `EncodeError::InvariantViolation` if any identifier has nonzero bytes
/// past the 13-byte wire field, or the leader slot is out of range. No
/// partial or truncated packet is ever produced.
pub fn encode_snapshot(state: &RoomState) -> Result<Bytes, EncodeError> {
    if state.leader_slot as usize >= MAX_PLAYERS {
        return Err(EncodeError::InvariantViolation(
            "leader slot out of range",
        ));
    }
    for slot in &state.players {
        if slot.player_id.0[wire::PLAYER_ID_WIRE_LEN..]
            .iter()
            .any(|&b| b != 0)
        {
            return Err(EncodeError::InvariantViolation(
                "player id exceeds 13-byte wire field",
            ));
        }
    }

    let mut buf = BytesMut::with_capacity(
        wire::HEADER_LEN + wire::SNAPSHOT_PAYLOAD_LEN,
    );
    put_header(&mut buf, wire::ID_SNAPSHOT, wire::SNAPSHOT_PAYLOAD_LEN);

    buf.put_u8(state.leader_slot);
    buf.put_bytes(0, 3);
    buf.put_slice(&state.room_name);
    buf.put_slice(&state.unknown_a);
    buf.put_u8(0);
    for slot in &state.players {
        buf.put_slice(&slot.player_id.0[..wire::PLAYER_ID_WIRE_LEN]);
        buf.put_u8(slot.character_id);
        buf.put_u8(slot.status_byte);
        buf.put_u8(0);
        buf.put_u32_le(slot.rank_raw);
        buf.put_u32_le(slot.unknown_b);
        buf.put_u32_le(slot.unknown_c);
    }
    buf.put_u32_le(state.selected_map);
    buf.put_u32_le(state.select_flag);

    debug_assert_eq!(
        buf.len(),
        wire::HEADER_LEN + wire::SNAPSHOT_PAYLOAD_LEN
    );
    Ok(buf.freeze())
}

/// Decodes a full room snapshot back into a [`RoomState`].
///
/// The server never receives snapshots; this is the codec's inverse for
/// round-trip tests and capture-inspection tooling, and it validates as
/// strictly as the request decoders do.
pub fn decode_snapshot(buf: &[u8]) -> Result<RoomState, DecodeError> {
    let (id, payload) = split_packet(buf)?;
    if id != wire::ID_SNAPSHOT {
        return Err(DecodeError::BadPacketId { found: id });
    }
    expect_payload_len(id, payload, wire::SNAPSHOT_PAYLOAD_LEN)?;

    let mut room_name = [0u8; wire::ROOM_NAME_LEN];
    room_name.copy_from_slice(
        &payload[wire::ROOM_NAME_OFFSET..wire::UNKNOWN_A_OFFSET],
    );
    let mut unknown_a = [0u8; wire::UNKNOWN_A_LEN];
    unknown_a.copy_from_slice(
        &payload[wire::UNKNOWN_A_OFFSET
            ..wire::UNKNOWN_A_OFFSET + wire::UNKNOWN_A_LEN],
    );

    let mut players = [PlayerSlot::default(); MAX_PLAYERS];
    for (i, slot) in players.iter_mut().enumerate() {
        let base =
            wire::PLAYER_BLOCKS_OFFSET + i * wire::PLAYER_BLOCK_LEN;
        let block = &payload[base..base + wire::PLAYER_BLOCK_LEN];
        let mut id_bytes = [0u8; 16];
        id_bytes[..wire::PLAYER_ID_WIRE_LEN]
            .copy_from_slice(&block[..wire::PLAYER_ID_WIRE_LEN]);
        *slot = PlayerSlot {
            player_id: PlayerId(id_bytes),
            character_id: block[13],
            status_byte: block[14],
            rank_raw: read_u32_le(&block[16..20]),
            unknown_b: read_u32_le(&block[20..24]),
            unknown_c: read_u32_le(&block[24..28]),
        };
    }

    Ok(RoomState {
        leader_slot: payload[0],
        room_name,
        unknown_a,
        players,
        selected_map: read_u32_le(
            &payload[wire::SELECTED_MAP_OFFSET
                ..wire::SELECTED_MAP_OFFSET + 4],
        ),
        select_flag: read_u32_le(
            &payload
                [wire::SELECT_FLAG_OFFSET..wire::SELECT_FLAG_OFFSET + 4],
        ),
    })
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Decodes an inbound request packet.
///
/// Packet id and length are validated before any payload field is read. A
/// buffer with an id outside the request family fails with `BadPacketId`;
/// a fixed-size mismatch fails with `BadLength`. Never a best-effort
/// parse — a half-understood request is worse than a rejected one.
pub fn decode_request(buf: &[u8]) -> Result<Request, DecodeError> {
    let (id, payload) = split_packet(buf)?;
    match id {
        wire::ID_MAP_SELECT_REQUEST => {
            expect_payload_len(id, payload, wire::MAP_SELECT_PAYLOAD_LEN)?;
            Ok(Request::MapSelect {
                map: read_u32_le(payload),
            })
        }
        wire::ID_KICK_REQUEST => {
            expect_payload_len(id, payload, wire::KICK_PAYLOAD_LEN)?;
            Ok(Request::Kick {
                slot: read_u32_le(payload),
            })
        }
        wire::ID_CHARACTER_SELECT_REQUEST => {
            Ok(Request::CharacterSelect {
                requester: decode_wire_id(id, payload)?,
            })
        }
        wire::ID_READY_TOGGLE_REQUEST => Ok(Request::ReadyToggle {
            requester: decode_wire_id(id, payload)?,
        }),
        wire::ID_LEAVE_REQUEST => Ok(Request::Leave {
            requester: decode_wire_id(id, payload)?,
        }),
        other => Err(DecodeError::BadPacketId { found: other }),
    }
}

/// Reads the 13-byte wire id carried by character/ready/leave requests,
/// widening it to the 16-byte logical identifier.
fn decode_wire_id(
    id: u16,
    payload: &[u8],
) -> Result<PlayerId, DecodeError> {
    expect_payload_len(id, payload, wire::ID_CARRYING_PAYLOAD_LEN)?;
    let mut bytes = [0u8; 16];
    bytes[..wire::PLAYER_ID_WIRE_LEN].copy_from_slice(payload);
    Ok(PlayerId(bytes))
}

// ---------------------------------------------------------------------------
// Acks
// ---------------------------------------------------------------------------

/// Encodes the fixed 10-byte acknowledge for `kind`.
///
/// The payload is a constant success template; it carries no per-request
/// data, so this cannot fail. The client blocks (UI unresponsive, request
/// resent on a timer) until it parses this exact pattern.
pub fn encode_ack(kind: AckKind) -> Bytes {
    let mut buf =
        BytesMut::with_capacity(wire::HEADER_LEN + wire::ACK_PAYLOAD_LEN);
    put_header(&mut buf, kind.packet_id(), wire::ACK_PAYLOAD_LEN);
    buf.put_slice(&wire::ACK_PAYLOAD);
    buf.freeze()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied_slot(name: &str, character: u8) -> PlayerSlot {
        PlayerSlot {
            player_id: PlayerId::from_text(name).unwrap(),
            character_id: character,
            status_byte: 0,
            rank_raw: 0,
            unknown_b: 0,
            unknown_c: 0,
        }
    }

    #[test]
    fn test_ack_templates_are_byte_exact() {
        // From captures: c60b 0600 01000000 0100 and c50b 0600 01000000 0100.
        assert_eq!(
            encode_ack(AckKind::MapSelect).as_ref(),
            &[0xc6, 0x0b, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00]
        );
        assert_eq!(
            encode_ack(AckKind::CharacterSelect).as_ref(),
            &[0xc5, 0x0b, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_ack_is_constant_per_kind() {
        // Ack content never varies — two calls, identical bytes.
        assert_eq!(
            encode_ack(AckKind::ReadyToggle),
            encode_ack(AckKind::ReadyToggle)
        );
        // Kinds differ only in the packet id.
        let leave = encode_ack(AckKind::Leave);
        let kick = encode_ack(AckKind::Kick);
        assert_eq!(leave[2..], kick[2..]);
        assert_ne!(leave[..2], kick[..2]);
    }

    #[test]
    fn test_decode_map_select_request() {
        // Captured: de07 0400 05000000 (player picked map 5).
        let buf = [0xde, 0x07, 0x04, 0x00, 0x05, 0x00, 0x00, 0x00];
        assert_eq!(
            decode_request(&buf).unwrap(),
            Request::MapSelect { map: 5 }
        );
    }

    #[test]
    fn test_decode_character_select_request() {
        // Captured: dc07 0d00 "BABA" + 9 zero bytes. The chosen character
        // is nowhere in the packet.
        let mut buf = vec![0xdc, 0x07, 0x0d, 0x00];
        buf.extend_from_slice(b"BABA");
        buf.extend_from_slice(&[0u8; 9]);
        assert_eq!(
            decode_request(&buf).unwrap(),
            Request::CharacterSelect {
                requester: PlayerId::from_text("BABA").unwrap()
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_packet_id() {
        let buf = [0xd0, 0x07, 0x04, 0x00, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(
            decode_request(&buf),
            Err(DecodeError::BadPacketId { found: 0x07d0 })
        );
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        // Header claims 4 payload bytes but carries 3.
        let buf = [0xde, 0x07, 0x04, 0x00, 0x05, 0x00, 0x00];
        assert!(matches!(
            decode_request(&buf),
            Err(DecodeError::BadLength { id: 0x07de, .. })
        ));
        // Header and buffer agree, but the size is wrong for the kind.
        let buf = [0xde, 0x07, 0x02, 0x00, 0x05, 0x00];
        assert!(matches!(
            decode_request(&buf),
            Err(DecodeError::BadLength {
                id: 0x07de,
                expected: 4,
                found: 2
            })
        ));
    }

    #[test]
    fn test_decode_rejects_short_header() {
        assert!(matches!(
            decode_request(&[0xde]),
            Err(DecodeError::BadLength { .. })
        ));
    }

    #[test]
    fn test_snapshot_length_and_header() {
        let state =
            RoomState::new(RoomState::name_from_text("Room").unwrap());
        let buf = encode_snapshot(&state).unwrap();
        assert_eq!(
            buf.len(),
            wire::HEADER_LEN + wire::SNAPSHOT_PAYLOAD_LEN
        );
        assert_eq!(&buf[..2], &[0xee, 0x03]);
        assert_eq!(&buf[2..4], &[0x9c, 0x00]);
    }

    #[test]
    fn test_snapshot_trailer_lands_where_the_client_reads() {
        // The client reads a u16 at payload offset 148 (its map-select
        // gate) and a u16 at 152 (its waiting-room gate). Both must be
        // the low halves of the map and flag words, nothing else.
        let mut state = RoomState::new(
            RoomState::name_from_text("TestRoom1").unwrap(),
        );
        state.selected_map = 5;
        let buf = encode_snapshot(&state).unwrap();
        let payload = &buf[wire::HEADER_LEN..];
        assert_eq!(payload.len(), 156);
        assert_eq!(&payload[148..152], &[0x05, 0x00, 0x00, 0x00]);
        assert_eq!(&payload[152..156], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(
            u16::from_le_bytes([payload[148], payload[149]]),
            state.readiness_counter_a()
        );
        assert_eq!(
            u16::from_le_bytes([payload[152], payload[153]]),
            state.readiness_counter_b()
        );
    }

    #[test]
    fn test_snapshot_player_blocks_at_fixed_stride() {
        let mut state =
            RoomState::new(RoomState::name_from_text("Room").unwrap());
        state.players[2] = occupied_slot("JEREMY", 6);
        let buf = encode_snapshot(&state).unwrap();
        let base = wire::HEADER_LEN
            + wire::PLAYER_BLOCKS_OFFSET
            + 2 * wire::PLAYER_BLOCK_LEN;
        assert_eq!(&buf[base..base + 6], b"JEREMY");
        assert_eq!(buf[base + 13], 6);
    }

    #[test]
    fn test_snapshot_rejects_overwide_id() {
        let mut state =
            RoomState::new(RoomState::name_from_text("Room").unwrap());
        // Hand-build an id with a nonzero byte past the wire field.
        let mut bytes = [0u8; 16];
        bytes[..14].copy_from_slice(b"FOURTEENCHARSX");
        state.players[0].player_id = PlayerId(bytes);
        assert!(matches!(
            encode_snapshot(&state),
            Err(EncodeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_bad_leader_slot() {
        let mut state =
            RoomState::new(RoomState::name_from_text("Room").unwrap());
        state.leader_slot = 4;
        assert!(matches!(
            encode_snapshot(&state),
            Err(EncodeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_snapshot_round_trip_preserves_every_field() {
        let mut state = RoomState::new(
            RoomState::name_from_text("TestRoom1").unwrap(),
        );
        state.leader_slot = 2;
        state.unknown_a = [9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0xff];
        state.players[0] = PlayerSlot {
            player_id: PlayerId::from_text("BABA").unwrap(),
            character_id: 1,
            status_byte: 1,
            rank_raw: 0x0102_0304,
            unknown_b: 0xdead_beef,
            unknown_c: 7,
        };
        state.players[3] = occupied_slot("FANOUI", 8);
        state.selected_map = 5;
        state.select_flag = 4;

        let encoded = encode_snapshot(&state).unwrap();
        let decoded = decode_snapshot(&encoded).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_decode_snapshot_rejects_wrong_id() {
        let state =
            RoomState::new(RoomState::name_from_text("Room").unwrap());
        let mut buf = encode_snapshot(&state).unwrap().to_vec();
        buf[0] = 0xef;
        assert_eq!(
            decode_snapshot(&buf),
            Err(DecodeError::BadPacketId { found: 0x03ef })
        );
    }

    #[test]
    fn test_decode_snapshot_rejects_truncation() {
        let state =
            RoomState::new(RoomState::name_from_text("Room").unwrap());
        let buf = encode_snapshot(&state).unwrap();
        assert!(matches!(
            decode_snapshot(&buf[..buf.len() - 1]),
            Err(DecodeError::BadLength { .. })
        ));
    }
}
