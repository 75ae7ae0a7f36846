//! Seat resolution over the four-slot player array.
//!
//! The original client kept "current room" and "local player" in process
//! globals and scanned the array against them. Here the array and the id
//! are explicit parameters; the scans are otherwise the same linear,
//! first-match walks the client performs.

use duskhall_protocol::{PlayerId, PlayerSlot, MAX_PLAYERS};

/// Finds the seat occupied by `player_id`: linear scan, first full
/// 16-byte match wins. Empty seats never match a real id because a real
/// id is never all-zero.
pub fn resolve(
    players: &[PlayerSlot; MAX_PLAYERS],
    player_id: &PlayerId,
) -> Option<usize> {
    players
        .iter()
        .position(|slot| !slot.is_empty() && slot.player_id == *player_id)
}

/// The client-side analog of [`resolve`]: which seat is "mine". Kept for
/// parity with the client's lookup; behavior is identical.
pub fn local_slot_for(
    players: &[PlayerSlot; MAX_PLAYERS],
    local_player_id: &PlayerId,
) -> Option<usize> {
    resolve(players, local_player_id)
}

/// Lowest-index empty seat, if any.
pub fn first_free(players: &[PlayerSlot; MAX_PLAYERS]) -> Option<usize> {
    players.iter().position(PlayerSlot::is_empty)
}

/// Lowest-index occupied seat, if any. Leadership falls back to this
/// seat when the leader departs.
pub fn lowest_occupied(
    players: &[PlayerSlot; MAX_PLAYERS],
) -> Option<usize> {
    players.iter().position(|slot| !slot.is_empty())
}

/// Lowest character id in 1..=8 not held by any occupant. With four
/// seats and eight characters a free id always exists; the fallback arm
/// is unreachable.
pub fn lowest_unused_character(
    players: &[PlayerSlot; MAX_PLAYERS],
) -> u8 {
    (1..=8)
        .find(|c| {
            !players
                .iter()
                .any(|slot| !slot.is_empty() && slot.character_id == *c)
        })
        .unwrap_or(1)
}
