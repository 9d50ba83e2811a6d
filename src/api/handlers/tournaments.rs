use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::{
    CreateTournamentRequest, EditTournamentRequest, LimitParams, OpponentResponse, PlayerRef,
    TournamentListParams,
};
use crate::domain::{Match, NewTournament, PlayerId, Tournament, TournamentId, TournamentUpdate};
use crate::errors::EngineError;

pub async fn create_tournament(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<Tournament>), EngineError> {
    let new = NewTournament {
        name: request.name,
        maintainer_id: request.maintainer_id,
        start_date: request.start_date,
        duration_days: request.duration_days,
        players: request.players,
    };
    let tournament = state.engine.create_tournament(&new)?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn list_tournaments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TournamentListParams>,
) -> Result<Json<Vec<Tournament>>, EngineError> {
    let limit = params.limit.unwrap_or(state.engine.settings().active_tournaments_limit);
    Ok(Json(state.engine.list_tournaments(params.maintainer_id, limit)?))
}

pub async fn get_tournament(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Tournament>, EngineError> {
    Ok(Json(state.engine.get_tournament(tournament_id)?))
}

pub async fn edit_tournament(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<EditTournamentRequest>,
) -> Result<Json<Tournament>, EngineError> {
    let update = TournamentUpdate {
        name: request.name,
        maintainer_id: request.maintainer_id,
        start_date: request.start_date,
        duration_days: request.duration_days,
    };
    Ok(Json(state.engine.edit_tournament(tournament_id, &update)?))
}

pub async fn get_tournament_matches(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Match>>, EngineError> {
    Ok(Json(state.engine.tournament_matches(tournament_id)?))
}

pub async fn get_active_tournaments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<Tournament>>, EngineError> {
    let limit = params.limit.unwrap_or(state.engine.settings().active_tournaments_limit);
    Ok(Json(state.engine.active_tournaments(limit)?))
}

pub async fn add_participant(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<PlayerRef>,
) -> Result<Json<Tournament>, EngineError> {
    Ok(Json(state.engine.add_participant(tournament_id, request.player_id)?))
}

pub async fn find_opponent(
    State(state): State<Arc<AppState>>,
    Path((tournament_id, player_id)): Path<(TournamentId, PlayerId)>,
) -> Result<Json<OpponentResponse>, EngineError> {
    let opponent_id = state.engine.find_opponent(tournament_id, player_id)?;
    Ok(Json(OpponentResponse {
        tournament_id,
        player_id,
        opponent_id,
    }))
}
