use std::fmt;

use thiserror::Error;

use crate::domain::{MatchId, MatchState, PlayerId, TournamentId};

/// Errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: MatchState, to: MatchState },

    #[error("No opponent left for player {player_id} in tournament {tournament_id}")]
    NoOpponentAvailable {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },

    #[error("Player {player_id} is not participating in tournament {tournament_id}")]
    InvalidParticipant {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },

    #[error("Result does not match the roster: {0}")]
    ResultMismatch(ResultMismatch),

    #[error("Match {match_id} is {state}; results need a running or paused match")]
    MatchNotInPlay { match_id: MatchId, state: MatchState },

    #[error("Match {match_id} is {state}; the roster can only change while ready")]
    RosterLocked { match_id: MatchId, state: MatchState },

    #[error("Match {match_id} is a master match and is not scored directly")]
    MasterNotScorable { match_id: MatchId },

    #[error("A bracket needs at least one round")]
    InvalidRoundCount,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Match {match_id} lists player {player_id} more than once")]
    CorruptResults { match_id: MatchId, player_id: PlayerId },

    #[error("Maintenance run already in progress")]
    MaintenanceInProgress,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        EngineError::NotFound { entity, id }
    }
}

/// Why a submitted result list was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultMismatch {
    RosterSize { expected: usize, actual: usize },
    NotOnRoster(PlayerId),
    DuplicatePlayer(PlayerId),
    PlacementOutOfRange { player_id: PlayerId, placement: i64 },
}

impl fmt::Display for ResultMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultMismatch::RosterSize { expected, actual } => {
                write!(f, "expected {} results, got {}", expected, actual)
            }
            ResultMismatch::NotOnRoster(player_id) => {
                write!(f, "player {} is not on the roster", player_id)
            }
            ResultMismatch::DuplicatePlayer(player_id) => {
                write!(f, "player {} is listed twice", player_id)
            }
            ResultMismatch::PlacementOutOfRange { player_id, placement } => {
                write!(f, "placement {} for player {} is outside 1..=4", placement, player_id)
            }
        }
    }
}
