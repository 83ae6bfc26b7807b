//! Arena entities: stickmen, obstacles, the power-up and team metadata

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rules;

/// Per-room player id, assigned sequentially and never reused
pub type PlayerId = u32;

/// Which side a stickman fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamId {
    #[serde(rename = "team_a")]
    A,
    #[serde(rename = "team_b")]
    B,
}

impl TeamId {
    pub const ALL: [TeamId; 2] = [TeamId::A, TeamId::B];

    pub fn opponent(self) -> Self {
        match self {
            TeamId::A => TeamId::B,
            TeamId::B => TeamId::A,
        }
    }
}

/// Display metadata for a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub color: String,
    /// Opaque image reference supplied by the client
    #[serde(default)]
    pub image: Option<String>,
}

/// The two teams of a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub team_a: Team,
    pub team_b: Team,
}

impl Teams {
    pub fn get(&self, team: TeamId) -> &Team {
        match team {
            TeamId::A => &self.team_a,
            TeamId::B => &self.team_b,
        }
    }

    pub fn set(&mut self, team: TeamId, details: Team) {
        match team {
            TeamId::A => self.team_a = details,
            TeamId::B => self.team_b = details,
        }
    }
}

impl Default for Teams {
    fn default() -> Self {
        Self {
            team_a: Team {
                name: "Team A".to_string(),
                color: "#3b82f6".to_string(),
                image: None,
            },
            team_b: Team {
                name: "Team B".to_string(),
                color: "#ef4444".to_string(),
                image: None,
            },
        }
    }
}

/// Round score pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundScores {
    pub team_a: u32,
    pub team_b: u32,
}

impl RoundScores {
    pub fn get(&self, team: TeamId) -> u32 {
        match team {
            TeamId::A => self.team_a,
            TeamId::B => self.team_b,
        }
    }

    /// Credit a round win, returning the team's new total
    pub fn credit(&mut self, team: TeamId) -> u32 {
        let score = match team {
            TeamId::A => &mut self.team_a,
            TeamId::B => &mut self.team_b,
        };
        *score += 1;
        *score
    }
}

/// Life/animation state of a stickman
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickmanState {
    Idle,
    Moving,
    Attacking,
    Jumping,
    Hit,
    Dead,
}

/// Cosmetic facing, derived from horizontal velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facing {
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Facing {
    pub fn initial(team: TeamId) -> Self {
        match team {
            TeamId::A => Facing::UpRight,
            TeamId::B => Facing::DownLeft,
        }
    }

    /// Facing after moving with the given velocity; a zero component keeps
    /// the previous half of the facing
    pub fn from_velocity(self, vx: f32, vy: f32) -> Self {
        let up = if vy < 0.0 {
            true
        } else if vy > 0.0 {
            false
        } else {
            matches!(self, Facing::UpLeft | Facing::UpRight)
        };
        let left = if vx < 0.0 {
            true
        } else if vx > 0.0 {
            false
        } else {
            matches!(self, Facing::UpLeft | Facing::DownLeft)
        };
        match (up, left) {
            (true, true) => Facing::UpLeft,
            (true, false) => Facing::UpRight,
            (false, true) => Facing::DownLeft,
            (false, false) => Facing::DownRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    Hammer,
}

/// Raw key names a stickman responds to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlBindings {
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub jump: String,
    pub attack: String,
}

impl ControlBindings {
    /// `w/s/a/d` layout, given to the first player in a room
    pub fn primary() -> Self {
        Self {
            up: "w".to_string(),
            down: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            jump: "enter".to_string(),
            attack: " ".to_string(),
        }
    }

    /// Arrow-key layout for everyone else
    pub fn secondary() -> Self {
        Self {
            up: "arrowup".to_string(),
            down: "arrowdown".to_string(),
            left: "arrowleft".to_string(),
            right: "arrowright".to_string(),
            jump: "enter".to_string(),
            attack: " ".to_string(),
        }
    }
}

/// One player-controlled combatant
#[derive(Debug, Clone, Serialize)]
pub struct Stickman {
    pub id: PlayerId,
    pub team: TeamId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub health: f32,
    pub mana: f32,
    pub airborne: bool,
    pub attack_cooldown: u32,
    pub hit_stun: u32,
    pub kills: u32,
    pub facing: Facing,
    pub state: StickmanState,
    pub power_up: Option<PowerUpKind>,
    pub power_up_ticks: u32,
    pub controls: ControlBindings,
    /// Connection that owns this player
    #[serde(skip)]
    pub connection_id: Uuid,
}

impl Stickman {
    pub fn new(
        id: PlayerId,
        team: TeamId,
        controls: ControlBindings,
        connection_id: Uuid,
        spawn: (f32, f32),
    ) -> Self {
        Self {
            id,
            team,
            x: spawn.0,
            y: spawn.1,
            z: 0.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            health: rules::MAX_HEALTH,
            mana: rules::MAX_MANA,
            airborne: false,
            attack_cooldown: 0,
            hit_stun: 0,
            kills: 0,
            facing: Facing::initial(team),
            state: StickmanState::Idle,
            power_up: None,
            power_up_ticks: 0,
            controls,
            connection_id,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.state == StickmanState::Dead
    }

    /// Restore the stickman for a new round; kills carry over
    pub fn respawn(&mut self, spawn: (f32, f32)) {
        let kills = self.kills;
        *self = Self::new(
            self.id,
            self.team,
            self.controls.clone(),
            self.connection_id,
            spawn,
        );
        self.kills = kills;
    }

    /// Damage dealt by one attack from this stickman
    pub fn attack_damage(&self) -> f32 {
        match self.power_up {
            Some(PowerUpKind::Hammer) => rules::ATTACK_DAMAGE * rules::HAMMER_DAMAGE_MULTIPLIER,
            None => rules::ATTACK_DAMAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Box,
    Wall,
    Rock,
    Tire,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 4] = [
        ObstacleKind::Box,
        ObstacleKind::Wall,
        ObstacleKind::Rock,
        ObstacleKind::Tire,
    ];
}

/// Static terrain, immutable after room creation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    pub x: f32,
    pub y: f32,
    /// Extent along x
    pub width: f32,
    /// Extent along y
    pub depth: f32,
    pub height: f32,
}

/// The single collectible a room may hold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerUp {
    pub id: u64,
    pub kind: PowerUpKind,
    pub x: f32,
    pub y: f32,
    pub visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_follows_velocity_signs() {
        let facing = Facing::UpRight;
        assert_eq!(facing.from_velocity(-1.0, 1.0), Facing::DownLeft);
        assert_eq!(facing.from_velocity(1.0, 0.0), Facing::UpRight);
        assert_eq!(Facing::DownLeft.from_velocity(0.0, -2.0), Facing::UpLeft);
    }

    #[test]
    fn respawn_keeps_kills_and_resets_vitals() {
        let mut s = Stickman::new(3, TeamId::B, ControlBindings::secondary(), Uuid::nil(), (1.0, 2.0));
        s.kills = 2;
        s.health = 0.0;
        s.state = StickmanState::Dead;
        s.power_up = Some(PowerUpKind::Hammer);
        s.respawn((10.0, -10.0));
        assert_eq!(s.kills, 2);
        assert_eq!(s.health, rules::MAX_HEALTH);
        assert_eq!(s.state, StickmanState::Idle);
        assert_eq!(s.power_up, None);
        assert_eq!((s.x, s.y), (10.0, -10.0));
    }

    #[test]
    fn team_ids_serialize_as_wire_names() {
        assert_eq!(serde_json::to_string(&TeamId::A).unwrap(), "\"team_a\"");
        assert_eq!(serde_json::to_string(&Facing::DownRight).unwrap(), "\"down-right\"");
    }

    #[test]
    fn round_score_credit_returns_total() {
        let mut scores = RoundScores::default();
        scores.credit(TeamId::B);
        assert_eq!(scores.credit(TeamId::B), 2);
        assert_eq!(scores.get(TeamId::A), 0);
    }
}
