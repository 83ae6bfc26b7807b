//! Coordinate projection and collision predicates

use super::entity::{Obstacle, PowerUp, Stickman};
use super::rules;

/// Project a ground-plane position onto 30° isometric screen axes
#[allow(dead_code)]
pub fn world_to_iso(x: f32, y: f32) -> (f32, f32) {
    let angle = std::f32::consts::FRAC_PI_6;
    ((x - y) * angle.cos(), (x + y) * angle.sin())
}

/// Inverse of [`world_to_iso`]
#[allow(dead_code)]
pub fn iso_to_world(iso_x: f32, iso_y: f32) -> (f32, f32) {
    let angle = std::f32::consts::FRAC_PI_6;
    let a = iso_x / angle.cos();
    let b = iso_y / angle.sin();
    ((a + b) / 2.0, (b - a) / 2.0)
}

pub fn distance_2d(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

pub fn distance_3d(a: &Stickman, b: &Stickman) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dz = b.z - a.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Check whether a stickman standing at (x, y) with feet at height z is
/// inside an obstacle's footprint and below its top
pub fn hits_obstacle(x: f32, y: f32, z: f32, obstacle: &Obstacle) -> bool {
    // Slightly smaller than the body radius so stickmen can slip past corners
    let buffer = rules::STICKMAN_RADIUS * 0.8;
    let dx = (x - obstacle.x).abs();
    let dy = (y - obstacle.y).abs();
    dx < buffer + obstacle.width / 2.0 && dy < buffer + obstacle.depth / 2.0 && z < obstacle.height
}

/// First obstacle blocking the given position, if any
pub fn find_obstacle_hit(x: f32, y: f32, z: f32, obstacles: &[Obstacle]) -> Option<&Obstacle> {
    obstacles.iter().find(|o| hits_obstacle(x, y, z, o))
}

/// Check whether two stickmen overlap on the ground plane
pub fn stickmen_overlap(a: &Stickman, b: &Stickman) -> bool {
    distance_2d(a.x, a.y, b.x, b.y) < rules::STICKMAN_RADIUS * 2.0
}

/// Check whether a stickman is close enough to claim a visible power-up
pub fn can_pick_up(stickman: &Stickman, power_up: &PowerUp) -> bool {
    power_up.visible
        && distance_2d(stickman.x, stickman.y, power_up.x, power_up.y) < rules::POWER_UP_PICKUP_RADIUS
}

/// Check whether two obstacle footprints, grown by `margin`, intersect
pub fn footprints_overlap(a: &Obstacle, b: &Obstacle, margin: f32) -> bool {
    (a.x - b.x).abs() < (a.width + b.width) / 2.0 + margin
        && (a.y - b.y).abs() < (a.depth + b.depth) / 2.0 + margin
}

/// Check whether an obstacle footprint comes within `radius` of a point
pub fn footprint_near_point(obstacle: &Obstacle, x: f32, y: f32, radius: f32) -> bool {
    let nearest_x = x.clamp(obstacle.x - obstacle.width / 2.0, obstacle.x + obstacle.width / 2.0);
    let nearest_y = y.clamp(obstacle.y - obstacle.depth / 2.0, obstacle.y + obstacle.depth / 2.0);
    distance_2d(x, y, nearest_x, nearest_y) < radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{ControlBindings, ObstacleKind, PowerUpKind, TeamId};
    use uuid::Uuid;

    fn stickman_at(x: f32, y: f32) -> Stickman {
        Stickman::new(0, TeamId::A, ControlBindings::primary(), Uuid::nil(), (x, y))
    }

    fn crate_at(x: f32, y: f32) -> Obstacle {
        Obstacle {
            id: 0,
            kind: ObstacleKind::Box,
            x,
            y,
            width: 30.0,
            depth: 30.0,
            height: 30.0,
        }
    }

    #[test]
    fn iso_projection_inverts() {
        let (ix, iy) = world_to_iso(120.0, -45.0);
        let (x, y) = iso_to_world(ix, iy);
        assert!((x - 120.0).abs() < 1e-3);
        assert!((y + 45.0).abs() < 1e-3);
    }

    #[test]
    fn obstacle_blocks_only_below_its_top() {
        let obstacle = crate_at(0.0, 0.0);
        assert!(hits_obstacle(20.0, 0.0, 0.0, &obstacle));
        assert!(!hits_obstacle(20.0, 0.0, 31.0, &obstacle));
        assert!(!hits_obstacle(24.0, 0.0, 0.0, &obstacle));
    }

    #[test]
    fn pickup_requires_visibility_and_radius() {
        let s = stickman_at(0.0, 0.0);
        let mut hammer = PowerUp {
            id: 1,
            kind: PowerUpKind::Hammer,
            x: 24.0,
            y: 0.0,
            visible: true,
        };
        assert!(can_pick_up(&s, &hammer));
        hammer.visible = false;
        assert!(!can_pick_up(&s, &hammer));
        hammer.visible = true;
        hammer.x = 25.0;
        assert!(!can_pick_up(&s, &hammer));
    }

    #[test]
    fn stickmen_overlap_inside_two_radii() {
        assert!(stickmen_overlap(&stickman_at(0.0, 0.0), &stickman_at(19.0, 0.0)));
        assert!(!stickmen_overlap(&stickman_at(0.0, 0.0), &stickman_at(20.0, 0.0)));
    }

    #[test]
    fn footprint_distance_to_point() {
        let obstacle = crate_at(100.0, 100.0);
        assert!(footprint_near_point(&obstacle, 80.0, 100.0, 10.0));
        assert!(!footprint_near_point(&obstacle, 60.0, 100.0, 10.0));
        assert!(footprints_overlap(&obstacle, &crate_at(125.0, 100.0), 0.0));
        assert!(!footprints_overlap(&obstacle, &crate_at(135.0, 100.0), 0.0));
    }
}
