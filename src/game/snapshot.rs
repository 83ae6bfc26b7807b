//! Full-state room snapshots for network transmission

use serde::Serialize;
use uuid::Uuid;

use super::entity::{Obstacle, PowerUp, RoundScores, Stickman, Team, Teams};
use super::phase::GamePhase;
use super::room::Room;

/// Everything a client needs to redraw a room. Always a full state, never a
/// delta, so receivers replace their whole view.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room_id: Uuid,
    pub tick: u64,
    pub stickmen: Vec<Stickman>,
    pub obstacles: Vec<Obstacle>,
    pub power_up: Option<PowerUp>,
    pub game_state: GamePhase,
    pub countdown: i32,
    /// Match winner
    pub winner: Option<Team>,
    pub teams: Teams,
    pub round_scores: RoundScores,
    pub round_winner: Option<Team>,
    pub round: u32,
}

impl RoomSnapshot {
    pub fn capture(room: &Room) -> Self {
        let teams = room.teams().clone();
        Self {
            room_id: room.id(),
            tick: room.current_tick(),
            stickmen: room.stickmen().to_vec(),
            obstacles: room.obstacles().to_vec(),
            power_up: room.power_up().cloned(),
            game_state: room.phase(),
            countdown: room.countdown(),
            winner: room.match_winner().map(|t| teams.get(t).clone()),
            round_winner: room.round_winner().map(|t| teams.get(t).clone()),
            round_scores: room.round_scores(),
            round: room.round(),
            teams,
        }
    }
}
