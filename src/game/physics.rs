//! Stickman motion: integration, world collision and body separation

use super::entity::{Obstacle, Stickman, StickmanState};
use super::rules;
use super::spatial;

/// Physics system for updating stickman positions and velocities
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance position by one tick of velocity, then apply gravity.
    /// Gravity acts every tick; the ground clamp absorbs it for grounded bodies.
    pub fn integrate(s: &mut Stickman) {
        s.x += s.vx;
        s.y += s.vy;
        s.z += s.vz;
        s.vz -= rules::GRAVITY;
    }

    /// Revert horizontal movement into an obstacle, axis by axis.
    /// A stickman that was already overlapping is allowed to walk out.
    pub fn block_on_obstacles(s: &mut Stickman, prev_x: f32, prev_y: f32, obstacles: &[Obstacle]) {
        if spatial::find_obstacle_hit(prev_x, prev_y, s.z, obstacles).is_some() {
            return;
        }
        if spatial::find_obstacle_hit(s.x, prev_y, s.z, obstacles).is_some() {
            s.x = prev_x;
            s.vx = 0.0;
        }
        if spatial::find_obstacle_hit(s.x, s.y, s.z, obstacles).is_some() {
            s.y = prev_y;
            s.vy = 0.0;
        }
    }

    /// Ground plane and arena boundary
    pub fn apply_world_bounds(s: &mut Stickman) {
        if s.z <= 0.0 {
            s.z = 0.0;
            s.vz = 0.0;
            s.airborne = false;
            if s.state == StickmanState::Jumping {
                s.state = StickmanState::Idle;
            }
        }

        let limit_x = rules::arena_limit_x();
        let limit_y = rules::arena_limit_y();
        if s.x < -limit_x || s.x > limit_x {
            s.x = s.x.clamp(-limit_x, limit_x);
            s.vx = 0.0;
        }
        if s.y < -limit_y || s.y > limit_y {
            s.y = s.y.clamp(-limit_y, limit_y);
            s.vy = 0.0;
        }
    }

    /// Push apart every overlapping pair of living stickmen once.
    /// Purely positional: each side moves half the overlap.
    pub fn separate(stickmen: &mut [Stickman]) {
        let min_distance = rules::STICKMAN_RADIUS * 2.0;

        for i in 0..stickmen.len() {
            for j in (i + 1)..stickmen.len() {
                let (left, right) = stickmen.split_at_mut(j);
                let a = &mut left[i];
                let b = &mut right[0];
                if a.is_dead() || b.is_dead() || !spatial::stickmen_overlap(a, b) {
                    continue;
                }

                let ((ax, ay), (bx, by)) =
                    Self::resolve_overlap(a.x, a.y, b.x, b.y, min_distance);
                a.x = ax;
                a.y = ay;
                b.x = bx;
                b.y = by;
            }
        }

        let limit_x = rules::arena_limit_x();
        let limit_y = rules::arena_limit_y();
        for s in stickmen.iter_mut() {
            s.x = s.x.clamp(-limit_x, limit_x);
            s.y = s.y.clamp(-limit_y, limit_y);
        }
    }

    /// Positions after splitting the overlap of two bodies equally.
    /// Returns ((new_x1, new_y1), (new_x2, new_y2))
    pub fn resolve_overlap(
        x1: f32, y1: f32,
        x2: f32, y2: f32,
        min_distance: f32,
    ) -> ((f32, f32), (f32, f32)) {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist >= min_distance {
            return ((x1, y1), (x2, y2));
        }

        if dist < 0.001 {
            // Same spot, separate along x so the result is deterministic
            let push = min_distance / 2.0;
            return ((x1 - push, y1), (x2 + push, y2));
        }

        let nx = dx / dist;
        let ny = dy / dist;
        let push = (min_distance - dist) / 2.0;

        ((x1 - nx * push, y1 - ny * push), (x2 + nx * push, y2 + ny * push))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{ControlBindings, ObstacleKind, TeamId};
    use uuid::Uuid;

    fn stickman_at(id: u32, x: f32, y: f32) -> Stickman {
        Stickman::new(id, TeamId::A, ControlBindings::primary(), Uuid::nil(), (x, y))
    }

    #[test]
    fn gravity_decays_vertical_velocity_every_tick() {
        let mut s = stickman_at(0, 0.0, 0.0);
        s.vz = rules::JUMP_IMPULSE;
        s.airborne = true;
        PhysicsSystem::integrate(&mut s);
        assert_eq!(s.z, rules::JUMP_IMPULSE);
        assert!((s.vz - (rules::JUMP_IMPULSE - rules::GRAVITY)).abs() < 1e-6);
    }

    #[test]
    fn landing_clears_airborne() {
        let mut s = stickman_at(0, 0.0, 0.0);
        s.z = -1.0;
        s.vz = -5.0;
        s.airborne = true;
        s.state = StickmanState::Jumping;
        PhysicsSystem::apply_world_bounds(&mut s);
        assert_eq!(s.z, 0.0);
        assert_eq!(s.vz, 0.0);
        assert!(!s.airborne);
        assert_eq!(s.state, StickmanState::Idle);
    }

    #[test]
    fn boundary_clamps_and_zeroes_offending_axis() {
        let mut s = stickman_at(0, 1000.0, 10.0);
        s.vx = 3.0;
        s.vy = 3.0;
        PhysicsSystem::apply_world_bounds(&mut s);
        assert_eq!(s.x, rules::arena_limit_x());
        assert_eq!(s.vx, 0.0);
        assert_eq!(s.vy, 3.0);
    }

    #[test]
    fn separation_splits_overlap_equally() {
        let mut stickmen = vec![stickman_at(0, 0.0, 0.0), stickman_at(1, 10.0, 0.0)];
        PhysicsSystem::separate(&mut stickmen);
        assert!((stickmen[0].x + 5.0).abs() < 1e-4);
        assert!((stickmen[1].x - 15.0).abs() < 1e-4);
    }

    #[test]
    fn stacked_stickmen_are_pulled_apart() {
        let mut stickmen = vec![stickman_at(0, 5.0, 5.0), stickman_at(1, 5.0, 5.0)];
        PhysicsSystem::separate(&mut stickmen);
        let gap = spatial::distance_2d(stickmen[0].x, stickmen[0].y, stickmen[1].x, stickmen[1].y);
        assert!((gap - rules::STICKMAN_RADIUS * 2.0).abs() < 1e-4);
    }

    #[test]
    fn dead_stickmen_are_not_pushed() {
        let mut stickmen = vec![stickman_at(0, 0.0, 0.0), stickman_at(1, 10.0, 0.0)];
        stickmen[1].state = StickmanState::Dead;
        PhysicsSystem::separate(&mut stickmen);
        assert_eq!(stickmen[0].x, 0.0);
        assert_eq!(stickmen[1].x, 10.0);
    }

    #[test]
    fn obstacle_blocks_walking_but_not_jumping() {
        let wall = Obstacle {
            id: 0,
            kind: ObstacleKind::Wall,
            x: 30.0,
            y: 0.0,
            width: 20.0,
            depth: 60.0,
            height: 50.0,
        };
        let mut walker = stickman_at(0, 10.0, 0.0);
        walker.vx = 3.0;
        PhysicsSystem::integrate(&mut walker);
        PhysicsSystem::block_on_obstacles(&mut walker, 10.0, 0.0, std::slice::from_ref(&wall));
        assert_eq!(walker.x, 10.0);
        assert_eq!(walker.vx, 0.0);

        let mut jumper = stickman_at(1, 10.0, 0.0);
        jumper.z = 55.0;
        jumper.vx = 3.0;
        PhysicsSystem::integrate(&mut jumper);
        PhysicsSystem::block_on_obstacles(&mut jumper, 10.0, 0.0, std::slice::from_ref(&wall));
        assert_eq!(jumper.x, 13.0);
    }
}
