//! Combat system - attack acceptance, melee hit detection, damage

use std::collections::BTreeMap;

use super::entity::{PlayerId, Stickman, StickmanState};
use super::rules;
use super::spatial;

/// Damage gathered against one target during a tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingDamage {
    pub amount: f32,
    /// Distinct attackers whose hits landed, in attack order
    pub attackers: Vec<PlayerId>,
}

/// Pending damage keyed by target index in the room's stickman list
pub type DamageLedger = BTreeMap<usize, PendingDamage>;

/// A kill credited to one attacker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillEvent {
    pub killer_id: PlayerId,
    pub victim_id: PlayerId,
}

/// Combat system for attacks and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a stickman may start an attack now
    pub fn can_attack(s: &Stickman) -> bool {
        s.attack_cooldown == 0 && s.mana >= rules::ATTACK_MANA_COST
    }

    /// Commit an accepted attack: cooldown to ceiling, mana debited
    pub fn start_attack(s: &mut Stickman) {
        s.attack_cooldown = rules::ATTACK_COOLDOWN;
        s.mana = (s.mana - rules::ATTACK_MANA_COST).max(0.0);
        s.state = StickmanState::Attacking;
    }

    /// Gather damage from every attack that became active this tick.
    /// Targets are living stickmen of the other team within 3-D range.
    pub fn resolve_attacks(stickmen: &[Stickman], attackers: &[usize]) -> DamageLedger {
        let mut ledger = DamageLedger::new();

        for &attacker_idx in attackers {
            let attacker = &stickmen[attacker_idx];
            if attacker.is_dead() {
                continue;
            }
            let damage = attacker.attack_damage();

            for (target_idx, target) in stickmen.iter().enumerate() {
                if target.team == attacker.team || target.is_dead() {
                    continue;
                }
                if spatial::distance_3d(attacker, target) >= rules::ATTACK_RANGE {
                    continue;
                }

                let pending = ledger.entry(target_idx).or_default();
                pending.amount += damage;
                if !pending.attackers.contains(&attacker.id) {
                    pending.attackers.push(attacker.id);
                }
            }
        }

        ledger
    }

    /// Apply gathered damage. Survivors are stunned; a target brought to
    /// zero dies and every contributing attacker is credited one kill.
    pub fn apply_damage(stickmen: &mut [Stickman], ledger: DamageLedger) -> Vec<KillEvent> {
        let mut kills = Vec::new();

        for (target_idx, pending) in ledger {
            let Some(target) = stickmen.get_mut(target_idx) else {
                continue;
            };

            target.health = (target.health - pending.amount).clamp(0.0, rules::MAX_HEALTH);
            if target.health > 0.0 {
                target.state = StickmanState::Hit;
                target.hit_stun = rules::HIT_STUN;
            } else {
                target.state = StickmanState::Dead;
                target.vx = 0.0;
                target.vy = 0.0;
                target.vz = 0.0;
                let victim_id = target.id;
                kills.extend(pending.attackers.iter().map(|&killer_id| KillEvent {
                    killer_id,
                    victim_id,
                }));
            }
        }

        for kill in &kills {
            if let Some(killer) = stickmen.iter_mut().find(|s| s.id == kill.killer_id) {
                killer.kills += 1;
            }
        }

        kills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{ControlBindings, PowerUpKind, TeamId};
    use uuid::Uuid;

    fn fighter(id: u32, team: TeamId, x: f32) -> Stickman {
        Stickman::new(id, team, ControlBindings::primary(), Uuid::nil(), (x, 0.0))
    }

    #[test]
    fn attack_needs_zero_cooldown_and_mana() {
        let mut s = fighter(0, TeamId::A, 0.0);
        assert!(CombatSystem::can_attack(&s));
        s.attack_cooldown = 1;
        assert!(!CombatSystem::can_attack(&s));
        s.attack_cooldown = 0;
        s.mana = rules::ATTACK_MANA_COST - 0.5;
        assert!(!CombatSystem::can_attack(&s));
    }

    #[test]
    fn start_attack_debits_mana_and_sets_ceiling() {
        let mut s = fighter(0, TeamId::A, 0.0);
        CombatSystem::start_attack(&mut s);
        assert_eq!(s.attack_cooldown, rules::ATTACK_COOLDOWN);
        assert_eq!(s.mana, rules::MAX_MANA - rules::ATTACK_MANA_COST);
        assert_eq!(s.state, StickmanState::Attacking);
    }

    #[test]
    fn only_opponents_in_range_are_hit() {
        let stickmen = vec![
            fighter(0, TeamId::A, 0.0),
            fighter(1, TeamId::A, 10.0),
            fighter(2, TeamId::B, 59.0),
            fighter(3, TeamId::B, 61.0),
        ];
        let ledger = CombatSystem::resolve_attacks(&stickmen, &[0]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[&2].amount, rules::ATTACK_DAMAGE);
    }

    #[test]
    fn height_counts_towards_range() {
        let mut stickmen = vec![fighter(0, TeamId::A, 0.0), fighter(1, TeamId::B, 40.0)];
        stickmen[1].z = 50.0;
        assert!(CombatSystem::resolve_attacks(&stickmen, &[0]).is_empty());
    }

    #[test]
    fn hammer_multiplies_damage() {
        let mut stickmen = vec![fighter(0, TeamId::A, 0.0), fighter(1, TeamId::B, 20.0)];
        stickmen[0].power_up = Some(PowerUpKind::Hammer);
        let ledger = CombatSystem::resolve_attacks(&stickmen, &[0]);
        assert_eq!(ledger[&1].amount, rules::ATTACK_DAMAGE * rules::HAMMER_DAMAGE_MULTIPLIER);
    }

    #[test]
    fn simultaneous_attackers_share_the_kill() {
        let mut stickmen = vec![
            fighter(0, TeamId::A, 0.0),
            fighter(1, TeamId::A, 5.0),
            fighter(2, TeamId::B, 20.0),
        ];
        stickmen[2].health = 15.0;
        let ledger = CombatSystem::resolve_attacks(&stickmen, &[0, 1]);
        assert_eq!(ledger[&2].amount, 2.0 * rules::ATTACK_DAMAGE);

        let kills = CombatSystem::apply_damage(&mut stickmen, ledger);
        assert_eq!(kills.len(), 2);
        assert_eq!(stickmen[2].health, 0.0);
        assert_eq!(stickmen[2].state, StickmanState::Dead);
        assert_eq!(stickmen[0].kills, 1);
        assert_eq!(stickmen[1].kills, 1);
    }

    #[test]
    fn survivor_is_stunned() {
        let mut stickmen = vec![fighter(0, TeamId::A, 0.0), fighter(1, TeamId::B, 20.0)];
        let ledger = CombatSystem::resolve_attacks(&stickmen, &[0]);
        let kills = CombatSystem::apply_damage(&mut stickmen, ledger);
        assert!(kills.is_empty());
        assert_eq!(stickmen[1].state, StickmanState::Hit);
        assert_eq!(stickmen[1].hit_stun, rules::HIT_STUN);
        assert_eq!(stickmen[1].health, rules::MAX_HEALTH - rules::ATTACK_DAMAGE);
    }

    #[test]
    fn dead_targets_are_ignored() {
        let mut stickmen = vec![fighter(0, TeamId::A, 0.0), fighter(1, TeamId::B, 20.0)];
        stickmen[1].state = StickmanState::Dead;
        stickmen[1].health = 0.0;
        assert!(CombatSystem::resolve_attacks(&stickmen, &[0]).is_empty());
    }
}
