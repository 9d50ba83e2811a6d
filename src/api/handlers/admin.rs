use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use super::AppState;
use crate::errors::EngineError;

/// Run maintenance now and answer with the run report.
pub async fn run_maintenance(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return (StatusCode::FORBIDDEN, "Admin endpoint disabled").into_response();
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    if provided != Some(expected) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    log::info!("Admin triggered maintenance");
    let service = Arc::clone(&state.maintenance);
    match tokio::task::spawn_blocking(move || service.run()).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            log::error!("Maintenance task panicked: {:?}", e);
            EngineError::Storage(anyhow::anyhow!("maintenance task failed")).into_response()
        }
    }
}
