//! Entity construction and placement rules

use rand::Rng;
use uuid::Uuid;

use super::entity::{
    ControlBindings, Obstacle, ObstacleKind, PlayerId, PowerUp, PowerUpKind, Stickman, TeamId,
};
use super::rules;
use super::spatial;

/// Half-width of the random offset applied around a team's spawn point
pub const SPAWN_JITTER: f32 = 25.0;

/// Obstacles keep this clear radius around each team spawn point
const SPAWN_CLEAR_RADIUS: f32 = SPAWN_JITTER * 1.5 + rules::STICKMAN_RADIUS * 2.0;

/// Placement attempts per requested obstacle before giving up on it
const PLACEMENT_ATTEMPTS: usize = 32;

/// Spawn point of a team before jitter
pub fn team_spawn_base(team: TeamId) -> (f32, f32) {
    match team {
        TeamId::A => (-rules::GROUND_WIDTH / 3.0, 0.0),
        TeamId::B => (rules::GROUND_WIDTH / 3.0, 0.0),
    }
}

/// Team-biased spawn position with a small random offset
pub fn spawn_position<R: Rng + ?Sized>(team: TeamId, rng: &mut R) -> (f32, f32) {
    let (base_x, base_y) = team_spawn_base(team);
    (
        base_x + rng.gen_range(-SPAWN_JITTER..SPAWN_JITTER),
        base_y + rng.gen_range(-SPAWN_JITTER..SPAWN_JITTER),
    )
}

/// Build a stickman for a newly joined player. The first player in a room
/// gets the primary key layout.
pub fn create_stickman<R: Rng + ?Sized>(
    id: PlayerId,
    team: TeamId,
    first_in_room: bool,
    connection_id: Uuid,
    rng: &mut R,
) -> Stickman {
    let controls = if first_in_room {
        ControlBindings::primary()
    } else {
        ControlBindings::secondary()
    };
    Stickman::new(id, team, controls, connection_id, spawn_position(team, rng))
}

/// Generate a non-overlapping obstacle layout that leaves spawn zones clear.
/// May return fewer than `count` obstacles when the arena is crowded.
pub fn generate_obstacles<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Obstacle> {
    let mut obstacles: Vec<Obstacle> = Vec::with_capacity(count);
    let spawns = [team_spawn_base(TeamId::A), team_spawn_base(TeamId::B)];

    for _ in 0..count.saturating_mul(PLACEMENT_ATTEMPTS) {
        if obstacles.len() == count {
            break;
        }

        let candidate = random_obstacle(obstacles.len() as u32, rng);
        let near_spawn = spawns
            .iter()
            .any(|&(x, y)| spatial::footprint_near_point(&candidate, x, y, SPAWN_CLEAR_RADIUS));
        let overlaps = obstacles
            .iter()
            .any(|o| spatial::footprints_overlap(o, &candidate, rules::STICKMAN_RADIUS * 2.0));

        if !near_spawn && !overlaps {
            obstacles.push(candidate);
        }
    }

    obstacles
}

fn random_obstacle<R: Rng + ?Sized>(id: u32, rng: &mut R) -> Obstacle {
    let kind = ObstacleKind::ALL[rng.gen_range(0..ObstacleKind::ALL.len())];
    let mut size = || rng.gen_range(rules::OBSTACLE_MIN_SIZE..rules::OBSTACLE_MAX_SIZE);
    let (mut width, mut depth, mut height) = (size(), size(), size());

    match kind {
        ObstacleKind::Tire => {
            width = 30.0;
            depth = 30.0;
            height = 15.0;
        }
        ObstacleKind::Box => {
            width = width.max(30.0);
            depth = depth.max(30.0);
            height = 30.0;
        }
        ObstacleKind::Wall => {
            width = width.max(60.0);
            depth = depth.min(20.0);
            height = 50.0;
        }
        ObstacleKind::Rock => {}
    }

    // Keep the whole footprint inside the playable area
    let limit_x = rules::arena_limit_x() - width / 2.0;
    let limit_y = rules::arena_limit_y() - depth / 2.0;

    Obstacle {
        id,
        kind,
        x: rng.gen_range(-limit_x..limit_x),
        y: rng.gen_range(-limit_y..limit_y),
        width,
        depth,
        height,
    }
}

/// Place a hammer in the central half of the arena, away from obstacles
pub fn spawn_power_up<R: Rng + ?Sized>(id: u64, obstacles: &[Obstacle], rng: &mut R) -> PowerUp {
    let half_x = rules::GROUND_WIDTH / 2.0;
    let half_y = rules::GROUND_DEPTH / 2.0;

    let mut position = (0.0, 0.0);
    for _ in 0..PLACEMENT_ATTEMPTS {
        position = (rng.gen_range(-half_x..half_x), rng.gen_range(-half_y..half_y));
        let blocked = obstacles.iter().any(|o| {
            spatial::footprint_near_point(o, position.0, position.1, rules::POWER_UP_PICKUP_RADIUS)
        });
        if !blocked {
            break;
        }
    }

    PowerUp {
        id,
        kind: PowerUpKind::Hammer,
        x: position.0,
        y: position.1,
        visible: true,
    }
}
