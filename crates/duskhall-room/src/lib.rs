//! Lobby room state and lifecycle for Duskhall.
//!
//! Each room runs as an isolated Tokio task (actor model) owning a
//! [`LobbyEngine`] — the synchronous state machine that turns decoded
//! requests into ordered ack/snapshot replies.
//!
//! # Key types
//!
//! - [`LobbyEngine`] — the room state machine (pure, unit-testable)
//! - [`RoomManager`] — creates/destroys rooms, routes players
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`roster`] — seat resolution over the four-slot player array

mod config;
mod engine;
mod error;
mod manager;
mod room;
pub mod roster;

pub use config::{LobbyConfig, RoomId};
pub use engine::{
    Exchange, KickEffect, LeaveEffect, LobbyEngine, Phase,
    RetainAssigned, SelectionPolicy, CHARACTER_IDS, MAP_IDS,
};
pub use error::{CapacityError, RoomError, ValidationError};
pub use manager::RoomManager;
pub use room::{PlayerSender, RequestOutcome, RoomHandle, RoomInfo};
