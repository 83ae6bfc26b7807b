//! Room game-state machine

use serde::{Deserialize, Serialize};

/// Room game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Accepting joins, no simulation
    Lobby,
    /// Simulation frozen, 1 Hz countdown running
    Countdown,
    /// Tick engine running
    Playing,
    /// Simulation frozen between rounds
    RoundOver,
    /// Terminal
    MatchOver,
}

impl GamePhase {
    /// The legal-transition table
    pub fn can_transition_to(self, next: GamePhase) -> bool {
        use GamePhase::*;
        matches!(
            (self, next),
            (Lobby, Countdown)
                | (Countdown, Playing)
                | (Playing, RoundOver)
                | (RoundOver, Countdown)
                | (RoundOver, MatchOver)
                // Forfeit on disconnect
                | (Countdown, MatchOver)
                | (Playing, MatchOver)
        )
    }

    /// A match has started and not yet finished
    pub fn in_progress(self) -> bool {
        matches!(
            self,
            GamePhase::Countdown | GamePhase::Playing | GamePhase::RoundOver
        )
    }
}

/// Attempted move outside the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal phase transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: GamePhase,
    pub to: GamePhase,
}

/// Current phase plus the enforcement point for every change to it
#[derive(Debug, Clone, Copy)]
pub struct PhaseMachine {
    current: GamePhase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            current: GamePhase::Lobby,
        }
    }

    pub fn current(&self) -> GamePhase {
        self.current
    }

    pub fn transition(&mut self, next: GamePhase) -> Result<GamePhase, TransitionError> {
        if !self.current.can_transition_to(next) {
            return Err(TransitionError {
                from: self.current,
                to: next,
            });
        }
        let previous = self.current;
        self.current = next;
        Ok(previous)
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_round_cycle_is_legal() {
        let mut machine = PhaseMachine::new();
        for next in [
            GamePhase::Countdown,
            GamePhase::Playing,
            GamePhase::RoundOver,
            GamePhase::Countdown,
            GamePhase::Playing,
            GamePhase::RoundOver,
            GamePhase::MatchOver,
        ] {
            machine.transition(next).unwrap();
        }
        assert_eq!(machine.current(), GamePhase::MatchOver);
    }

    #[test]
    fn no_transition_leaves_match_over_or_goes_back() {
        let all = [
            GamePhase::Lobby,
            GamePhase::Countdown,
            GamePhase::Playing,
            GamePhase::RoundOver,
            GamePhase::MatchOver,
        ];
        for next in all {
            assert!(!GamePhase::MatchOver.can_transition_to(next));
            assert!(!next.can_transition_to(GamePhase::Lobby));
        }
        assert!(!GamePhase::Playing.can_transition_to(GamePhase::Countdown));
    }

    #[test]
    fn illegal_transition_keeps_phase() {
        let mut machine = PhaseMachine::new();
        let err = machine.transition(GamePhase::Playing).unwrap_err();
        assert_eq!(err.from, GamePhase::Lobby);
        assert_eq!(machine.current(), GamePhase::Lobby);
    }
}
