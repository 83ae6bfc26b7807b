//! Room manager - owns the room table and routes connection events to rooms

use std::collections::HashMap;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RoomSettings;
use crate::game::{PlayerId, Room, RoomError, RoomSnapshot, Stickman, Team, TeamId, Teams};
use crate::ws::protocol::ServerMsg;

use super::task::{RoomCommand, RoomHandle, RoomTask};

struct RoomEntry {
    handle: RoomHandle,
    task: JoinHandle<()>,
}

/// Registry of all live rooms plus which rooms each connection touches
pub struct RoomManager {
    settings: RoomSettings,
    rooms: DashMap<Uuid, RoomEntry>,
    /// connection -> rooms it created, watches or plays in
    memberships: DashMap<Uuid, Vec<Uuid>>,
}

impl RoomManager {
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            settings,
            rooms: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    fn handle(&self, room_id: &Uuid) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|e| e.handle.clone())
    }

    fn add_membership(&self, connection_id: Uuid, room_id: Uuid) {
        let mut rooms = self.memberships.entry(connection_id).or_default();
        if !rooms.contains(&room_id) {
            rooms.push(room_id);
        }
    }

    /// Allocate a room in `Lobby` and start its task. The creator is tracked
    /// so a room nobody joins is reclaimed when the creator leaves.
    pub fn create_room(&self, connection_id: Uuid, teams: Option<Teams>) -> Uuid {
        let room_id = Uuid::new_v4();
        let seed: u64 = rand::thread_rng().gen();
        let room = Room::new(
            room_id,
            teams.unwrap_or_default(),
            self.settings.clone(),
            seed,
        );

        let (task, handle) = RoomTask::new(room, self.settings.round_pause);
        let task = tokio::spawn(task.run());
        self.rooms.insert(handle.id, RoomEntry { handle, task });
        self.add_membership(connection_id, room_id);

        info!(room_id = %room_id, connection_id = %connection_id, seed, "Room created");
        room_id
    }

    /// Passive subscription to a room's state broadcasts
    pub fn subscribe(
        &self,
        connection_id: Uuid,
        room_id: Uuid,
    ) -> Result<broadcast::Receiver<ServerMsg>, RoomError> {
        let handle = self.handle(&room_id).ok_or(RoomError::RoomNotFound)?;
        self.add_membership(connection_id, room_id);
        Ok(handle.subscribe())
    }

    /// Claim a player slot for `connection_id`
    pub async fn join_request(
        &self,
        connection_id: Uuid,
        room_id: Uuid,
        team: TeamId,
        details: Team,
    ) -> Result<(Stickman, Teams), RoomError> {
        let handle = self.handle(&room_id).ok_or(RoomError::RoomNotFound)?;

        let (reply, reply_rx) = oneshot::channel();
        handle
            .command_tx
            .send(RoomCommand::Join {
                connection_id,
                team,
                details,
                reply,
            })
            .await
            .map_err(|_| RoomError::RoomNotFound)?;
        let joined = reply_rx.await.map_err(|_| RoomError::RoomNotFound)??;
        self.add_membership(connection_id, room_id);
        Ok(joined)
    }

    /// Fire-and-forget input. Unknown rooms and players are ignored, and
    /// input is dropped when the room's queue is full.
    pub fn submit_input(
        &self,
        room_id: Uuid,
        player_id: PlayerId,
        keys: HashMap<String, bool>,
        attack_keys: Vec<String>,
    ) {
        let Some(handle) = self.handle(&room_id) else {
            debug!(room_id = %room_id, player_id, "Input for unknown room");
            return;
        };
        let cmd = RoomCommand::Input {
            player_id,
            keys,
            attack_keys,
        };
        if handle.command_tx.try_send(cmd).is_err() {
            warn!(room_id = %room_id, player_id, "Room command queue full, input dropped");
        }
    }

    /// Release everything a closed connection held. Rooms left without
    /// players are deleted and their tasks stopped.
    pub async fn handle_disconnect(&self, connection_id: Uuid) {
        let Some((_, room_ids)) = self.memberships.remove(&connection_id) else {
            return;
        };

        for room_id in room_ids {
            let Some(handle) = self.handle(&room_id) else {
                continue;
            };

            let (reply, reply_rx) = oneshot::channel();
            let sent = handle
                .command_tx
                .send(RoomCommand::Disconnect {
                    connection_id,
                    reply,
                })
                .await;
            // A task that is already gone counts as empty
            let empty = match sent {
                Ok(()) => reply_rx.await.unwrap_or(true),
                Err(_) => true,
            };

            if empty {
                self.delete_room(room_id);
            }
        }
    }

    fn delete_room(&self, room_id: Uuid) {
        if let Some((_, entry)) = self.rooms.remove(&room_id) {
            // The task normally exits on its own; make sure no timer survives
            entry.task.abort();
            info!(room_id = %room_id, "Room deleted");
        }
    }

    /// Current full state of a room
    pub async fn snapshot(&self, room_id: Uuid) -> Option<RoomSnapshot> {
        let handle = self.handle(&room_id)?;
        let (reply, reply_rx) = oneshot::channel();
        handle
            .command_tx
            .send(RoomCommand::Snapshot { reply })
            .await
            .ok()?;
        reply_rx.await.ok()
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|e| e.value().handle.player_count()).sum()
    }

    /// Stop every room task
    pub fn shutdown(&self) {
        let ids: Vec<Uuid> = self.rooms.iter().map(|e| *e.key()).collect();
        for room_id in ids {
            self.delete_room(room_id);
        }
    }
}
