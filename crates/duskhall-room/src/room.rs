//! Room actor: an isolated Tokio task that owns one lobby engine.
//!
//! Each room runs in its own task and is the only mutator of its state,
//! which is what lets a snapshot describe a single consistent instant.
//! The outside world talks to it through an mpsc command channel;
//! replies come back on oneshot channels.
//!
//! Outbound packets go through one unbounded channel per player. An ack
//! and the snapshot it triggered are pushed into the requester's channel
//! back to back, so the wire order the client depends on is a property
//! of the queue, not of scheduling.

use std::collections::HashMap;

use bytes::Bytes;
use duskhall_protocol::{PlayerId, Request};
use tokio::sync::{mpsc, oneshot};

use crate::{
    Exchange, LobbyConfig, LobbyEngine, RoomError, RoomId,
    ValidationError,
};

/// Channel sender delivering encoded packets to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<Bytes>;

/// Membership changes caused by a request. The manager uses this to keep
/// its player index in step with the room.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    /// Players that stopped being members (left or kicked).
    pub departed: Vec<PlayerId>,
    /// The room has no occupants left and should be torn down.
    pub room_empty: bool,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        rank_raw: u32,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },
    Request {
        from: PlayerId,
        request: Request,
        reply: oneshot::Sender<Result<RequestOutcome, RoomError>>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A point-in-time view of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub player_count: usize,
    pub leader_slot: u8,
    pub selected_map: u32,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Seats a player and registers their outbound channel. Replies with
    /// the assigned slot index.
    pub async fn join(
        &self,
        player_id: PlayerId,
        rank_raw: u32,
        sender: PlayerSender,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player_id,
                rank_raw,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Delivers a decoded request on behalf of `from` and waits for the
    /// membership outcome. The packets themselves arrive through the
    /// player channels, never through this reply.
    pub async fn request(
        &self,
        from: PlayerId,
        request: Request,
    ) -> Result<RequestOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Request {
                from,
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    engine: LobbyEngine,
    /// Per-player outbound channels, keyed by seated id.
    senders: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    rank_raw,
                    sender,
                    reply,
                } => {
                    let result =
                        self.handle_join(player_id, rank_raw, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Request {
                    from,
                    request,
                    reply,
                } => {
                    let result = self.handle_request(from, request);
                    let empty = matches!(
                        &result,
                        Ok(outcome) if outcome.room_empty
                    );
                    let _ = reply.send(result);
                    if empty {
                        tracing::info!(
                            room_id = %self.room_id,
                            "room empty, closing"
                        );
                        break;
                    }
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => break,
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        rank_raw: u32,
        sender: PlayerSender,
    ) -> Result<usize, RoomError> {
        let (slot, snapshot) = self.engine.join(player_id, rank_raw)?;
        self.senders.insert(player_id, sender);
        self.broadcast(snapshot);
        tracing::info!(
            room_id = %self.room_id,
            player = %player_id,
            slot,
            players = self.engine.state().occupied(),
            "player joined"
        );
        Ok(slot)
    }

    fn handle_request(
        &mut self,
        from: PlayerId,
        request: Request,
    ) -> Result<RequestOutcome, RoomError> {
        match request {
            Request::MapSelect { map } => {
                let exchange = self.engine.map_select(map)?;
                self.deliver(from, exchange);
                Ok(RequestOutcome::default())
            }
            Request::CharacterSelect { requester } => {
                self.check_requester(from, requester);
                let exchange = self.engine.character_select(requester)?;
                self.deliver(from, exchange);
                Ok(RequestOutcome::default())
            }
            Request::ReadyToggle { requester } => {
                self.check_requester(from, requester);
                let exchange = self.engine.ready_toggle(requester)?;
                self.deliver(from, exchange);
                Ok(RequestOutcome::default())
            }
            Request::Leave { requester } => {
                self.check_requester(from, requester);
                let effect = self.engine.leave(requester)?;
                self.send_to(&from, effect.ack);
                self.senders.remove(&requester);
                let room_empty = effect.snapshot.is_none();
                if let Some(snapshot) = effect.snapshot {
                    self.broadcast(snapshot);
                }
                Ok(RequestOutcome {
                    departed: vec![requester],
                    room_empty,
                })
            }
            Request::Kick { slot } => {
                let effect = self.engine.kick(slot)?;
                self.send_to(&from, effect.ack);
                // The kicked player gets the snapshot showing their seat
                // emptied before their channel is dropped.
                self.broadcast(effect.snapshot);
                self.senders.remove(&effect.kicked);
                Ok(RequestOutcome {
                    departed: vec![effect.kicked],
                    room_empty: self.engine.state().occupied() == 0,
                })
            }
        }
    }

    /// Requests that carry their own id field are trusted (the original
    /// server does the same), but a mismatch with the connection's
    /// identity is worth a trace.
    fn check_requester(&self, from: PlayerId, requester: PlayerId) {
        if from != requester {
            tracing::warn!(
                room_id = %self.room_id,
                connection = %from,
                packet = %requester,
                "request id differs from connection identity"
            );
        }
    }

    /// Ack to the requester, then the snapshot to everyone. The
    /// requester's queue receives both in that order.
    fn deliver(&self, from: PlayerId, exchange: Exchange) {
        self.send_to(&from, exchange.ack);
        self.broadcast(exchange.snapshot);
    }

    fn broadcast(&self, packet: Bytes) {
        for sender in self.senders.values() {
            let _ = sender.send(packet.clone());
        }
    }

    /// Silently drops if the receiver is gone (player disconnected).
    fn send_to(&self, player_id: &PlayerId, packet: Bytes) {
        if let Some(sender) = self.senders.get(player_id) {
            let _ = sender.send(packet);
        }
    }

    fn info(&self) -> RoomInfo {
        let state = self.engine.state();
        RoomInfo {
            room_id: self.room_id,
            player_count: state.occupied(),
            leader_slot: state.leader_slot,
            selected_map: state.selected_map,
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    room_id: RoomId,
    config: &LobbyConfig,
) -> Result<RoomHandle, RoomError> {
    let room_name = duskhall_protocol::RoomState::name_from_text(
        &config.room_name,
    )
    .ok_or(ValidationError::OutOfRange {
        what: "room name byte length",
        value: config.room_name.len() as u32,
    })?;

    let (tx, rx) = mpsc::channel(config.command_channel_size);
    let actor = RoomActor {
        room_id,
        engine: LobbyEngine::new(room_name),
        senders: HashMap::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    Ok(RoomHandle {
        room_id,
        sender: tx,
    })
}
