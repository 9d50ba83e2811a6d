use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use rusqlite::ErrorCode;

use super::models::ErrorResponse;
use crate::errors::EngineError;

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::InvalidParticipant { .. } | EngineError::InvalidRoundCount => {
                StatusCode::BAD_REQUEST
            }
            EngineError::ResultMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::InvalidTransition { .. }
            | EngineError::NoOpponentAvailable { .. }
            | EngineError::MatchNotInPlay { .. }
            | EngineError::RosterLocked { .. }
            | EngineError::MasterNotScorable { .. } => StatusCode::CONFLICT,
            EngineError::MaintenanceInProgress => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Sqlite(e) if is_constraint_violation(e) => StatusCode::CONFLICT,
            EngineError::Storage(e) => match e.downcast_ref::<rusqlite::Error>() {
                Some(inner) if is_constraint_violation(inner) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            EngineError::CorruptResults { .. } | EngineError::Sqlite(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchState;
    use crate::errors::ResultMismatch;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(EngineError::not_found("player", 1).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            EngineError::ResultMismatch(ResultMismatch::NotOnRoster(3)).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            EngineError::InvalidTransition {
                from: MatchState::Finished,
                to: MatchState::Running
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(EngineError::InvalidRoundCount.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_failures_are_server_errors() {
        let err = EngineError::Storage(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
