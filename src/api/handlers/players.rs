use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::{LimitParams, RegisterPlayerRequest, StatusResponse};
use crate::domain::{LeaderboardEntry, Player, PlayerId};
use crate::errors::EngineError;

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        admitting: state.engine.is_admitting(),
    })
}

pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<LeaderboardEntry>>, EngineError> {
    let limit = params.limit.unwrap_or(state.engine.settings().leaderboard_limit);
    Ok(Json(state.engine.get_leaderboard(limit)?))
}

pub async fn register_player(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterPlayerRequest>,
) -> Result<(StatusCode, Json<Player>), EngineError> {
    let player = state.engine.register_player(request.username.trim())?;
    Ok((StatusCode::CREATED, Json(player)))
}

pub async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<PlayerId>,
) -> Result<Json<Player>, EngineError> {
    Ok(Json(state.engine.get_player(player_id)?))
}
