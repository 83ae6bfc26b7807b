//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{PlayerId, RoomSnapshot, Stickman, Team, TeamId, Teams};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Create a room with the given team metadata
    CreateRoom {
        #[serde(default)]
        teams: Option<Teams>,
    },

    /// Subscribe to a room's state broadcasts without taking a slot
    JoinRoom {
        room_id: Uuid,
    },

    /// Take a player slot on one team
    JoinRequest {
        room_id: Uuid,
        /// Client-chosen token echoed back in `player_assigned`
        session_id: String,
        team_id: TeamId,
        team_details: Team,
    },

    /// Raw key state plus attack intents for one player
    PlayerInput {
        room_id: Uuid,
        player_id: PlayerId,
        #[serde(default)]
        keys: HashMap<String, bool>,
        #[serde(default)]
        attack_keys: Vec<String>,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    RoomCreated {
        room_id: Uuid,
    },

    /// Answer to a successful `join_request`, sent to the requester only
    PlayerAssigned {
        session_id: String,
        player: Stickman,
        teams: Teams,
    },

    /// A room command was refused
    RoomError {
        message: String,
    },

    /// Full room state
    GameStateSync(RoomSnapshot),

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn room_error(err: impl std::fmt::Display) -> Self {
        Self::RoomError {
            message: err.to_string(),
        }
    }
}
