//! Per-player input staging between the network and the tick engine

use std::collections::HashMap;

use super::entity::{ControlBindings, PlayerId};
use super::rules::MAX_QUEUED_ATTACK_INTENTS;

/// Logical keys currently held by a player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl HeldKeys {
    /// Resolve a raw key-name map through a player's bindings.
    /// Key names compare case-insensitively.
    pub fn resolve(raw: &HashMap<String, bool>, controls: &ControlBindings) -> Self {
        let pressed = |binding: &str| {
            raw.iter()
                .any(|(key, &down)| down && key.eq_ignore_ascii_case(binding))
        };
        Self {
            up: pressed(&controls.up),
            down: pressed(&controls.down),
            left: pressed(&controls.left),
            right: pressed(&controls.right),
            jump: pressed(&controls.jump),
        }
    }
}

/// What the tick engine consumes for one player on one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub keys: HeldKeys,
    pub attack_requested: bool,
}

#[derive(Debug, Clone, Default)]
struct InputEntry {
    held: HeldKeys,
    attack_intents: Vec<String>,
}

/// Pending input for every player in a room
#[derive(Debug, Default)]
pub struct InputBuffer {
    entries: HashMap<PlayerId, InputEntry>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held-key set and queue any attack intents
    pub fn submit(&mut self, player_id: PlayerId, held: HeldKeys, attack_intents: Vec<String>) {
        let entry = self.entries.entry(player_id).or_default();
        entry.held = held;

        let room_left = MAX_QUEUED_ATTACK_INTENTS.saturating_sub(entry.attack_intents.len());
        entry
            .attack_intents
            .extend(attack_intents.into_iter().take(room_left));
    }

    /// Latest keys plus whether any attack was queued. The attack queue is
    /// emptied on every call, so an intent is never carried into a later tick.
    pub fn take(&mut self, player_id: PlayerId) -> TickInput {
        match self.entries.get_mut(&player_id) {
            Some(entry) => {
                let attack_requested = !entry.attack_intents.is_empty();
                entry.attack_intents.clear();
                TickInput {
                    keys: entry.held,
                    attack_requested,
                }
            }
            None => TickInput::default(),
        }
    }

    pub fn remove(&mut self, player_id: PlayerId) {
        self.entries.remove(&player_id);
    }

    /// Drop held keys and queued intents for everyone
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn queued_intents(&self, player_id: PlayerId) -> usize {
        self.entries
            .get(&player_id)
            .map(|e| e.attack_intents.len())
            .unwrap_or(0)
    }
}
