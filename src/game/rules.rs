//! Gameplay constants. Durations are in simulation ticks (60 per second)
//! and distances in world units.

/// Downward acceleration applied to vertical velocity every tick
pub const GRAVITY: f32 = 0.6;
/// Vertical velocity set by a jump
pub const JUMP_IMPULSE: f32 = 12.0;
/// Horizontal speed, identical for cardinal and diagonal movement
pub const MOVE_SPEED: f32 = 3.0;

pub const MAX_HEALTH: f32 = 200.0;
pub const MAX_MANA: f32 = 100.0;
pub const MANA_REGEN_PER_TICK: f32 = 1.0;

pub const STICKMAN_RADIUS: f32 = 10.0;

pub const ATTACK_MANA_COST: f32 = 20.0;
pub const ATTACK_RANGE: f32 = 60.0;
pub const ATTACK_DAMAGE: f32 = 10.0;
/// Cooldown ceiling set when an attack is accepted
pub const ATTACK_COOLDOWN: u32 = 8;
/// Ticks the `attacking` state is held after an attack starts
pub const ATTACK_ANIMATION: u32 = 4;
pub const HIT_STUN: u32 = 10;

pub const POWER_UP_SPAWN_INTERVAL: u32 = 300;
pub const HAMMER_DURATION: u32 = 600;
pub const HAMMER_DAMAGE_MULTIPLIER: f32 = 2.5;
pub const POWER_UP_PICKUP_RADIUS: f32 = 25.0;

/// Arena half-extents
pub const GROUND_WIDTH: f32 = 500.0;
pub const GROUND_DEPTH: f32 = 500.0;
/// Stickmen are kept inside this fraction of the half-extents
pub const BOUNDARY_INSET: f32 = 0.9;

pub const OBSTACLE_COUNT: usize = 8;
/// Most obstacles a room may be configured with
pub const MAX_OBSTACLE_COUNT: usize = 64;
pub const OBSTACLE_MIN_SIZE: f32 = 20.0;
pub const OBSTACLE_MAX_SIZE: f32 = 70.0;

pub const MAX_TEAM_SIZE: usize = 4;
pub const COUNTDOWN_START: i32 = 5;
pub const ROUNDS_TO_WIN: u32 = 3;

/// Pending attack intents kept per player between ticks
pub const MAX_QUEUED_ATTACK_INTENTS: usize = 8;

/// Clamp bound for x
pub fn arena_limit_x() -> f32 {
    GROUND_WIDTH * BOUNDARY_INSET
}

/// Clamp bound for y
pub fn arena_limit_y() -> f32 {
    GROUND_DEPTH * BOUNDARY_INSET
}
