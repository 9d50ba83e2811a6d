use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::{
    BracketResponse, CreateMatchRequest, MatchResponse, PlayerRef, RecordResultRequest,
    TransitionRequest,
};
use crate::domain::{Match, MatchId, MatchKind};
use crate::errors::EngineError;

pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<BracketResponse>), EngineError> {
    let rounds = request.rounds.unwrap_or(state.engine.settings().default_rounds);
    let bracket = state.engine.create_match(request.tournament_id, rounds)?;
    Ok((StatusCode::CREATED, Json(bracket.into())))
}

pub async fn get_match(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<MatchResponse>, EngineError> {
    let m = state.engine.get_match(match_id)?;
    let response = match m.kind {
        MatchKind::Master => MatchResponse::Bracket(state.engine.get_bracket(match_id)?.into()),
        MatchKind::Sub => MatchResponse::Single(m),
    };
    Ok(Json(response))
}

pub async fn enter_player(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<PlayerRef>,
) -> Result<Json<Match>, EngineError> {
    Ok(Json(state.engine.enter_player(match_id, request.player_id)?))
}

pub async fn transition_match(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Match>, EngineError> {
    Ok(Json(state.engine.transition_match(match_id, request.state)?))
}

pub async fn record_result(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<RecordResultRequest>,
) -> Result<Json<Match>, EngineError> {
    Ok(Json(state.engine.record_result(match_id, &request.results)?))
}
