use crate::domain::{Match, MatchState};
use crate::errors::EngineError;

impl MatchState {
    /// Ready matches still reserve their players, so only finished ones are inactive.
    pub fn is_active(self) -> bool {
        !matches!(self, MatchState::Finished)
    }

    pub fn can_transition_to(self, next: MatchState) -> bool {
        use MatchState::*;

        matches!(
            (self, next),
            (Ready, Running)
                | (Ready, Finished)
                | (Running, Paused)
                | (Running, Finished)
                | (Paused, Running)
                | (Paused, Finished)
        )
    }
}

impl Match {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// Move a match to `next`, leaving it untouched when the move is illegal.
pub fn transition(m: &mut Match, next: MatchState) -> Result<(), EngineError> {
    if !m.state.can_transition_to(next) {
        return Err(EngineError::InvalidTransition {
            from: m.state,
            to: next,
        });
    }
    m.state = next;
    Ok(())
}
