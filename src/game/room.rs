//! Room aggregate: entities, phase, scores and the fixed-step simulation

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;
use uuid::Uuid;

use crate::config::RoomSettings;

use super::combat::{CombatSystem, KillEvent};
use super::entity::{
    Obstacle, PlayerId, PowerUp, PowerUpKind, RoundScores, Stickman, StickmanState, Team, TeamId,
    Teams,
};
use super::error::RoomError;
use super::factory;
use super::input::{HeldKeys, InputBuffer, TickInput};
use super::phase::{GamePhase, PhaseMachine};
use super::physics::PhysicsSystem;
use super::rules;
use super::spatial;

/// Outcome of a round that just ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundResult {
    /// None on simultaneous elimination
    pub winner: Option<TeamId>,
    pub scores: RoundScores,
    /// Set when this round decided the match
    pub match_winner: Option<TeamId>,
}

/// What happened during one simulation step
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub attacks: Vec<PlayerId>,
    pub kills: Vec<KillEvent>,
    pub power_up_claimed_by: Option<PlayerId>,
    pub power_up_spawned: bool,
    pub round: Option<RoundResult>,
}

/// A player removed from the room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub player_id: PlayerId,
    pub team: TeamId,
    /// The match was in progress and has been forfeited
    pub forfeit: bool,
}

/// One isolated arena
pub struct Room {
    id: Uuid,
    settings: RoomSettings,
    phase: PhaseMachine,
    stickmen: Vec<Stickman>,
    obstacles: Vec<Obstacle>,
    power_up: Option<PowerUp>,
    teams: Teams,
    inputs: InputBuffer,
    countdown: i32,
    round: u32,
    round_scores: RoundScores,
    round_winner: Option<TeamId>,
    match_winner: Option<TeamId>,
    power_up_timer: u32,
    next_player_id: PlayerId,
    next_power_up_id: u64,
    tick: u64,
    rng: ChaCha8Rng,
}

impl Room {
    pub fn new(id: Uuid, teams: Teams, settings: RoomSettings, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let obstacles = factory::generate_obstacles(settings.obstacle_count, &mut rng);

        Self {
            id,
            countdown: settings.countdown_secs,
            settings,
            phase: PhaseMachine::new(),
            stickmen: Vec::new(),
            obstacles,
            power_up: None,
            teams,
            inputs: InputBuffer::new(),
            round: 1,
            round_scores: RoundScores::default(),
            round_winner: None,
            match_winner: None,
            power_up_timer: rules::POWER_UP_SPAWN_INTERVAL,
            next_player_id: 0,
            next_power_up_id: 0,
            tick: 0,
            rng,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> GamePhase {
        self.phase.current()
    }

    pub fn stickmen(&self) -> &[Stickman] {
        &self.stickmen
    }

    pub fn stickman(&self, player_id: PlayerId) -> Option<&Stickman> {
        self.stickmen.iter().find(|s| s.id == player_id)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn power_up(&self) -> Option<&PowerUp> {
        self.power_up.as_ref()
    }

    pub fn teams(&self) -> &Teams {
        &self.teams
    }

    pub fn countdown(&self) -> i32 {
        self.countdown
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn round_scores(&self) -> RoundScores {
        self.round_scores
    }

    pub fn round_winner(&self) -> Option<TeamId> {
        self.round_winner
    }

    pub fn match_winner(&self) -> Option<TeamId> {
        self.match_winner
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn player_count(&self) -> usize {
        self.stickmen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stickmen.is_empty()
    }

    fn team_size(&self, team: TeamId) -> usize {
        self.stickmen.iter().filter(|s| s.team == team).count()
    }

    fn team_alive(&self, team: TeamId) -> bool {
        self.stickmen.iter().any(|s| s.team == team && !s.is_dead())
    }

    /// Move to `next` through the transition table. Illegal moves are
    /// logged and leave the phase untouched.
    fn transition(&mut self, next: GamePhase) -> bool {
        match self.phase.transition(next) {
            Ok(_) => true,
            Err(e) => {
                warn!(room_id = %self.id, error = %e, "Rejected phase transition");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Add a player for `connection_id` on `team`, updating the team's
    /// display details. Starts the countdown once both teams are staffed.
    pub fn join(
        &mut self,
        connection_id: Uuid,
        team: TeamId,
        details: Team,
    ) -> Result<Stickman, RoomError> {
        if self.stickmen.iter().any(|s| s.connection_id == connection_id) {
            return Err(RoomError::AlreadyJoined);
        }
        if self.team_size(team) >= rules::MAX_TEAM_SIZE {
            return Err(RoomError::TeamFull {
                team_name: self.teams.get(team).name.clone(),
                max: rules::MAX_TEAM_SIZE,
            });
        }

        let id = self.next_player_id;
        self.next_player_id += 1;

        let stickman = factory::create_stickman(
            id,
            team,
            self.stickmen.is_empty(),
            connection_id,
            &mut self.rng,
        );
        self.stickmen.push(stickman.clone());
        self.teams.set(team, details);

        if self.phase() == GamePhase::Lobby
            && TeamId::ALL.iter().all(|&t| self.team_size(t) >= 1)
            && self.transition(GamePhase::Countdown)
        {
            self.countdown = self.settings.countdown_secs;
        }

        Ok(stickman)
    }

    /// Stage raw input for a player. Unknown players are ignored.
    pub fn submit_input(
        &mut self,
        player_id: PlayerId,
        keys: &HashMap<String, bool>,
        attack_intents: Vec<String>,
    ) {
        let Some(stickman) = self.stickman(player_id) else {
            return;
        };
        let held = HeldKeys::resolve(keys, &stickman.controls);
        self.inputs.submit(player_id, held, attack_intents);
    }

    /// Remove the player owned by `connection_id`. Leaving a match in
    /// progress forfeits it to the other team.
    pub fn disconnect(&mut self, connection_id: Uuid) -> Option<Departure> {
        let idx = self
            .stickmen
            .iter()
            .position(|s| s.connection_id == connection_id)?;
        let player = self.stickmen.remove(idx);
        self.inputs.remove(player.id);

        let forfeit = self.phase().in_progress();
        if forfeit && self.transition(GamePhase::MatchOver) {
            self.match_winner = [player.team.opponent(), player.team]
                .into_iter()
                .find(|&team| self.team_size(team) > 0);
        }

        Some(Departure {
            player_id: player.id,
            team: player.team,
            forfeit,
        })
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// One 1 Hz countdown step. Returns true when play starts.
    pub fn countdown_step(&mut self) -> bool {
        if self.phase() != GamePhase::Countdown {
            return false;
        }
        self.countdown -= 1;
        if self.countdown < 0 && self.transition(GamePhase::Playing) {
            self.round_winner = None;
            return true;
        }
        false
    }

    /// End of the between-round pause: reset the arena and count down again
    pub fn finish_round_pause(&mut self) -> bool {
        if self.phase() != GamePhase::RoundOver || !self.transition(GamePhase::Countdown) {
            return false;
        }

        self.round += 1;
        self.countdown = self.settings.countdown_secs;
        self.power_up = None;
        self.power_up_timer = rules::POWER_UP_SPAWN_INTERVAL;
        self.inputs.clear();
        for stickman in &mut self.stickmen {
            let spawn = factory::spawn_position(stickman.team, &mut self.rng);
            stickman.respawn(spawn);
        }
        true
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Advance the simulation one fixed step. Does nothing outside `Playing`.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if self.phase() != GamePhase::Playing {
            return report;
        }
        self.tick += 1;

        let mut attackers = Vec::new();
        for (idx, s) in self.stickmen.iter_mut().enumerate() {
            if s.is_dead() {
                continue;
            }

            decay_timers(s);
            s.mana = (s.mana + rules::MANA_REGEN_PER_TICK).min(rules::MAX_MANA);

            let input = self.inputs.take(s.id);
            if apply_input(s, input) {
                attackers.push(idx);
                report.attacks.push(s.id);
            }

            let (prev_x, prev_y) = (s.x, s.y);
            PhysicsSystem::integrate(s);
            PhysicsSystem::block_on_obstacles(s, prev_x, prev_y, &self.obstacles);
            PhysicsSystem::apply_world_bounds(s);
        }

        PhysicsSystem::separate(&mut self.stickmen);

        report.power_up_claimed_by = self.resolve_pickup();

        let ledger = CombatSystem::resolve_attacks(&self.stickmen, &attackers);
        report.kills = CombatSystem::apply_damage(&mut self.stickmen, ledger);

        report.power_up_spawned = self.advance_power_up_spawn();
        report.round = self.evaluate_round_end();
        report
    }

    /// First living stickman in join order within reach claims the power-up
    fn resolve_pickup(&mut self) -> Option<PlayerId> {
        let power_up = self.power_up.as_ref()?;
        let claimant = self
            .stickmen
            .iter_mut()
            .find(|s| !s.is_dead() && spatial::can_pick_up(s, power_up))?;

        claimant.power_up = Some(power_up.kind);
        claimant.power_up_ticks = match power_up.kind {
            PowerUpKind::Hammer => rules::HAMMER_DURATION,
        };
        let claimed_by = claimant.id;

        self.power_up = None;
        self.power_up_timer = rules::POWER_UP_SPAWN_INTERVAL;
        Some(claimed_by)
    }

    fn advance_power_up_spawn(&mut self) -> bool {
        if self.power_up.is_some() {
            return false;
        }
        self.power_up_timer = self.power_up_timer.saturating_sub(1);
        if self.power_up_timer > 0 {
            return false;
        }

        let id = self.next_power_up_id;
        self.next_power_up_id += 1;
        self.power_up = Some(factory::spawn_power_up(id, &self.obstacles, &mut self.rng));
        true
    }

    fn evaluate_round_end(&mut self) -> Option<RoundResult> {
        let alive_a = self.team_alive(TeamId::A);
        let alive_b = self.team_alive(TeamId::B);
        if alive_a && alive_b {
            return None;
        }

        let winner = match (alive_a, alive_b) {
            (true, false) => Some(TeamId::A),
            (false, true) => Some(TeamId::B),
            _ => None,
        };
        self.end_round(winner)
    }

    fn end_round(&mut self, winner: Option<TeamId>) -> Option<RoundResult> {
        if !self.transition(GamePhase::RoundOver) {
            return None;
        }
        self.round_winner = winner;
        self.inputs.clear();

        if let Some(team) = winner {
            let total = self.round_scores.credit(team);
            if total >= self.settings.rounds_to_win && self.transition(GamePhase::MatchOver) {
                self.match_winner = Some(team);
            }
        }

        Some(RoundResult {
            winner,
            scores: self.round_scores,
            match_winner: self.match_winner,
        })
    }

    #[cfg(test)]
    pub(crate) fn stickman_mut(&mut self, player_id: PlayerId) -> Option<&mut Stickman> {
        self.stickmen.iter_mut().find(|s| s.id == player_id)
    }

    #[cfg(test)]
    pub(crate) fn place_power_up(&mut self, x: f32, y: f32) {
        self.power_up = Some(PowerUp {
            id: self.next_power_up_id,
            kind: PowerUpKind::Hammer,
            x,
            y,
            visible: true,
        });
        self.next_power_up_id += 1;
    }

    #[cfg(test)]
    pub(crate) fn set_power_up_timer(&mut self, ticks: u32) {
        self.power_up_timer = ticks;
    }
}

/// Step 1: count down power-up, stun and cooldown timers
fn decay_timers(s: &mut Stickman) {
    if s.power_up_ticks > 0 {
        s.power_up_ticks -= 1;
        if s.power_up_ticks == 0 {
            s.power_up = None;
        }
    }

    if s.hit_stun > 0 {
        s.hit_stun -= 1;
        if s.hit_stun == 0 && s.state == StickmanState::Hit {
            s.state = StickmanState::Idle;
        }
    }

    if s.attack_cooldown > 0 {
        s.attack_cooldown -= 1;
    }
    if s.state == StickmanState::Attacking
        && s.attack_cooldown <= rules::ATTACK_COOLDOWN - rules::ATTACK_ANIMATION
    {
        s.state = StickmanState::Idle;
    }
}

/// Step 3: turn held keys into velocity, jumps and attacks.
/// Returns true when an attack was accepted.
fn apply_input(s: &mut Stickman, input: TickInput) -> bool {
    if matches!(s.state, StickmanState::Hit | StickmanState::Attacking) {
        return false;
    }

    let keys = input.keys;
    let mut dx = 0.0_f32;
    let mut dy = 0.0_f32;
    if keys.up {
        dy -= 1.0;
    }
    if keys.down {
        dy += 1.0;
    }
    if keys.left {
        dx -= 1.0;
    }
    if keys.right {
        dx += 1.0;
    }

    let length = (dx * dx + dy * dy).sqrt();
    let moving = length > 0.0;
    if moving {
        s.vx = dx / length * rules::MOVE_SPEED;
        s.vy = dy / length * rules::MOVE_SPEED;
        s.facing = s.facing.from_velocity(s.vx, s.vy);
    } else {
        s.vx = 0.0;
        s.vy = 0.0;
    }

    if keys.jump && !s.airborne {
        s.vz = rules::JUMP_IMPULSE;
        s.airborne = true;
    }

    if input.attack_requested && CombatSystem::can_attack(s) {
        CombatSystem::start_attack(s);
        return true;
    }

    s.state = if moving {
        StickmanState::Moving
    } else if s.airborne {
        StickmanState::Jumping
    } else {
        StickmanState::Idle
    };
    false
}
