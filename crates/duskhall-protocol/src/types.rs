//! Typed forms of the lobby-room packets.
//!
//! These structs mirror what the client keeps in memory, not what a tidy
//! greenfield design would look like. Several fields are opaque: their
//! bytes were observed in captures but their meaning is unresolved. Those
//! are carried verbatim — inventing semantics for them would desync the
//! client in ways we can't predict.

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Number of player slots in a room. Always exactly four; an empty seat is
/// an all-zero slot, never a shorter array.
pub const MAX_PLAYERS: usize = 4;

/// A player identifier: fixed 16 bytes of zero-padded ASCII/EUC-KR text.
///
/// This is a newtype over the raw bytes rather than a `String` because the
/// encoding is the client's business, not ours — we compare and forward the
/// bytes, we never interpret them. The all-zero value means "empty seat".
///
/// Only the first 13 bytes of the identifier ever travel on the wire (the
/// player block and the select requests both carry a 13-byte id field), so
/// a valid id must have zero bytes past index 12. [`PlayerId::from_text`]
/// enforces that; the codec re-checks it at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Builds an id from text, zero-padding to 16 bytes.
    ///
    /// Returns `None` if the text is longer than the wire allows
    /// (13 bytes) — never truncates silently.
    pub fn from_text(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() > crate::wire::PLAYER_ID_WIRE_LEN {
            return None;
        }
        let mut id = [0u8; 16];
        id[..bytes.len()].copy_from_slice(bytes);
        Some(Self(id))
    }

    /// Returns `true` if this is the all-zero "empty seat" id.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

/// Prints the id as trimmed text for logs. Non-ASCII bytes (EUC-KR names)
/// come out escaped rather than decoded — we don't ship the codepage table.
impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        for &b in &self.0[..end] {
            write!(f, "{}", b.escape_ascii())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PlayerSlot
// ---------------------------------------------------------------------------

/// One seat in the room: 28 bytes on the wire, stable position for the
/// room's lifetime.
///
/// `unknown_b`/`unknown_c` are preserved byte-for-byte; every observed
/// capture had them zero, but the client allocates them, so we round-trip
/// them instead of assuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerSlot {
    /// Who sits here. All-zero means the seat is empty.
    pub player_id: PlayerId,

    /// Selected character, 1..=8. 0 means not selected yet.
    pub character_id: u8,

    /// Ready flag. Observed values are 0 (preparing) and 1 (ready);
    /// other bits are carried through untouched.
    pub status_byte: u8,

    /// Raw rank value. Only the low byte is significant for display
    /// (see [`RankTier`]); the stored value is never altered.
    pub rank_raw: u32,

    /// Opaque, semantics unresolved.
    pub unknown_b: u32,

    /// Opaque, semantics unresolved.
    pub unknown_c: u32,
}

impl PlayerSlot {
    /// Returns `true` if no player occupies this seat.
    pub fn is_empty(&self) -> bool {
        self.player_id.is_empty()
    }

    /// Resets the seat to the empty (all-zero) state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The authoritative state of one lobby room — the typed form of the
/// `0x03ee` room snapshot packet.
///
/// Owned exclusively by the room engine serving that lobby; this crate only
/// defines the shape and the codec. All fields are public: the unresolved
/// ones (`unknown_a`, `select_flag`) are part of the contract precisely so
/// a future integration can refine their meaning without touching the
/// codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomState {
    /// Slot index (0..3) holding map-select/kick/start privileges. The
    /// client compares its own slot against this to unlock leader UI.
    pub leader_slot: u8,

    /// Room name, opaque zero-padded bytes (EUC-KR on Korean clients).
    pub room_name: [u8; 20],

    /// 11 bytes at a fixed offset in the snapshot; meaning unresolved.
    /// Preserved byte-for-byte.
    pub unknown_a: [u8; 11],

    /// The four seats. Index = lobby position.
    pub players: [PlayerSlot; MAX_PLAYERS],

    /// Selected map, 1..=5. Initialized to 1, matching the client's own
    /// room init; the wire never carries 0 here. The client also reads
    /// the low half of this field as a u16 gating value
    /// ([`readiness_counter_a`](Self::readiness_counter_a)).
    pub selected_map: u32,

    /// Observed values 1 and 4; echoed exactly as set, never inferred.
    /// The client's u16 view of it drives the "not all players have
    /// entered the waiting room" notice when it reads 4
    /// ([`readiness_counter_b`](Self::readiness_counter_b)).
    pub select_flag: u32,
}

impl RoomState {
    /// A freshly opened room: map and flag at 1 (the client initializes
    /// both words to 1), all seats empty, slot 0 leading.
    pub fn new(room_name: [u8; 20]) -> Self {
        Self {
            leader_slot: 0,
            room_name,
            unknown_a: [0; 11],
            players: [PlayerSlot::default(); MAX_PLAYERS],
            selected_map: 1,
            select_flag: 1,
        }
    }

    /// The client's u16 read of the map word (its map-select gating
    /// value). Same bytes as [`selected_map`](Self::selected_map), not a
    /// separate field.
    pub fn readiness_counter_a(&self) -> u16 {
        (self.selected_map & 0xffff) as u16
    }

    /// The client's u16 read of the flag word (its waiting-room gate).
    pub fn readiness_counter_b(&self) -> u16 {
        (self.select_flag & 0xffff) as u16
    }

    /// Builds the 20-byte name field from text. Returns `None` if the
    /// text doesn't fit — the codec never truncates.
    pub fn name_from_text(text: &str) -> Option<[u8; 20]> {
        let bytes = text.as_bytes();
        if bytes.len() > 20 {
            return None;
        }
        let mut name = [0u8; 20];
        name[..bytes.len()].copy_from_slice(bytes);
        Some(name)
    }

    /// Number of occupied seats.
    pub fn occupied(&self) -> usize {
        self.players.iter().filter(|s| !s.is_empty()).count()
    }
}

// ---------------------------------------------------------------------------
// Requests and acks
// ---------------------------------------------------------------------------

/// A decoded inbound request from the client.
///
/// Note what `CharacterSelect` does *not* carry: the chosen character. The
/// request is byte-identical no matter which character the player picked —
/// a confirmed protocol ambiguity. The authoritative value is supplied to
/// the room engine out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `0x07de`: the leader picked a map (1..=5, validated by the engine).
    MapSelect { map: u32 },

    /// `0x07dc`: a player confirmed a character. Carries only the
    /// requester's id; the client resends this on a timer until it sees
    /// the ack.
    CharacterSelect { requester: PlayerId },

    /// `0x07d9`: a player toggled their ready state.
    ReadyToggle { requester: PlayerId },

    /// `0x07da`: a player is leaving the room.
    Leave { requester: PlayerId },

    /// `0x07db`: the leader kicked the player at this slot index.
    Kick { slot: u32 },
}

impl Request {
    /// The ack kind that must answer this request.
    pub fn ack_kind(&self) -> AckKind {
        match self {
            Self::MapSelect { .. } => AckKind::MapSelect,
            Self::CharacterSelect { .. } => AckKind::CharacterSelect,
            Self::ReadyToggle { .. } => AckKind::ReadyToggle,
            Self::Leave { .. } => AckKind::Leave,
            Self::Kick { .. } => AckKind::Kick,
        }
    }
}

/// The five acknowledge packets. Each is a fixed 10-byte template — the
/// payload is a constant success code that never varies with the request,
/// confirmed across every observed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    MapSelect,
    CharacterSelect,
    ReadyToggle,
    Leave,
    Kick,
}

impl AckKind {
    /// The packet id this ack goes out under.
    pub fn packet_id(&self) -> u16 {
        match self {
            Self::MapSelect => crate::wire::ID_MAP_SELECT_ACK,
            Self::CharacterSelect => crate::wire::ID_CHARACTER_SELECT_ACK,
            Self::ReadyToggle => crate::wire::ID_READY_TOGGLE_ACK,
            Self::Leave => crate::wire::ID_LEAVE_ACK,
            Self::Kick => crate::wire::ID_KICK_ACK,
        }
    }
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MapSelect => write!(f, "map-select"),
            Self::CharacterSelect => write!(f, "character-select"),
            Self::ReadyToggle => write!(f, "ready-toggle"),
            Self::Leave => write!(f, "leave"),
            Self::Kick => write!(f, "kick"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rank tiers
// ---------------------------------------------------------------------------

/// Display tier derived from the low byte of `rank_raw`.
///
/// Presentation-only: the codec writes `rank_raw` untouched, and this
/// mapping is never applied during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RankTier {
    E,
    D,
    C,
    B,
    A,
    S,
    X,
}

impl RankTier {
    /// Maps a raw rank to its tier. Only the low byte is consulted.
    pub fn from_raw(rank_raw: u32) -> Self {
        match (rank_raw & 0xff) as u8 {
            0x00..=0x0a => Self::E,
            0x0b..=0x1e => Self::D,
            0x1f..=0x32 => Self::C,
            0x33..=0x5a => Self::B,
            0x5b..=0x8c => Self::A,
            0x8d..=0x9f => Self::S,
            _ => Self::X,
        }
    }
}

impl fmt::Display for RankTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::E => 'E',
            Self::D => 'D',
            Self::C => 'C',
            Self::B => 'B',
            Self::A => 'A',
            Self::S => 'S',
            Self::X => 'X',
        };
        write!(f, "{c}")
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_from_text_pads_with_zeros() {
        let id = PlayerId::from_text("BABA").unwrap();
        assert_eq!(&id.0[..4], b"BABA");
        assert!(id.0[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_player_id_from_text_rejects_overlong() {
        // 13 bytes is the wire limit; 14 must be refused, not truncated.
        assert!(PlayerId::from_text("THIRTEENCHARS").is_some());
        assert!(PlayerId::from_text("FOURTEENCHARSX").is_none());
    }

    #[test]
    fn test_player_id_empty_is_all_zero() {
        assert!(PlayerId::default().is_empty());
        assert!(!PlayerId::from_text("A").unwrap().is_empty());
    }

    #[test]
    fn test_player_id_display_trims_padding() {
        let id = PlayerId::from_text("JEREMY").unwrap();
        assert_eq!(id.to_string(), "JEREMY");
    }

    #[test]
    fn test_room_state_new_defaults() {
        let state =
            RoomState::new(RoomState::name_from_text("Room").unwrap());
        assert_eq!(state.leader_slot, 0);
        assert_eq!(state.selected_map, 1);
        assert_eq!(state.select_flag, 1);
        assert_eq!(state.occupied(), 0);
        assert!(state.players.iter().all(|s| s.is_empty()));
    }

    #[test]
    fn test_readiness_counters_alias_map_and_flag_words() {
        let mut state =
            RoomState::new(RoomState::name_from_text("Room").unwrap());
        assert_eq!(state.readiness_counter_a(), 1);
        assert_eq!(state.readiness_counter_b(), 1);
        state.selected_map = 5;
        state.select_flag = 4;
        assert_eq!(state.readiness_counter_a(), 5);
        assert_eq!(state.readiness_counter_b(), 4);
    }

    #[test]
    fn test_name_from_text_rejects_overlong() {
        assert!(RoomState::name_from_text("exactly-twenty-bytes").is_some());
        assert!(RoomState::name_from_text("twenty-one-bytes-long").is_none());
    }

    #[test]
    fn test_slot_clear_zeroes_everything() {
        let mut slot = PlayerSlot {
            player_id: PlayerId::from_text("BABA").unwrap(),
            character_id: 3,
            status_byte: 1,
            rank_raw: 0x1010,
            unknown_b: 7,
            unknown_c: 9,
        };
        slot.clear();
        assert!(slot.is_empty());
        assert_eq!(slot, PlayerSlot::default());
    }

    #[test]
    fn test_rank_tier_boundaries() {
        assert_eq!(RankTier::from_raw(0x00), RankTier::E);
        assert_eq!(RankTier::from_raw(0x0a), RankTier::E);
        assert_eq!(RankTier::from_raw(0x0b), RankTier::D);
        assert_eq!(RankTier::from_raw(0x1e), RankTier::D);
        assert_eq!(RankTier::from_raw(0x1f), RankTier::C);
        assert_eq!(RankTier::from_raw(0x32), RankTier::C);
        assert_eq!(RankTier::from_raw(0x33), RankTier::B);
        assert_eq!(RankTier::from_raw(0x5a), RankTier::B);
        assert_eq!(RankTier::from_raw(0x5b), RankTier::A);
        assert_eq!(RankTier::from_raw(0x8c), RankTier::A);
        assert_eq!(RankTier::from_raw(0x8d), RankTier::S);
        assert_eq!(RankTier::from_raw(0x9f), RankTier::S);
        assert_eq!(RankTier::from_raw(0xa0), RankTier::X);
        assert_eq!(RankTier::from_raw(0xff), RankTier::X);
    }

    #[test]
    fn test_rank_tier_uses_low_byte_only() {
        // 0x1010 has low byte 0x10 (16) → tier D.
        assert_eq!(RankTier::from_raw(0x1010), RankTier::D);
        // High bytes alone never change the tier.
        assert_eq!(RankTier::from_raw(0xff00), RankTier::E);
    }

    #[test]
    fn test_request_ack_pairing() {
        assert_eq!(
            Request::MapSelect { map: 3 }.ack_kind(),
            AckKind::MapSelect
        );
        assert_eq!(
            Request::Kick { slot: 1 }.ack_kind(),
            AckKind::Kick
        );
    }
}
