use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers::{admin, matches, players, tournaments, AppState};
use crate::api::models::ErrorResponse;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(players::get_status))
        .route("/api/leaderboard", get(players::get_leaderboard))
        .route("/api/players", post(players::register_player))
        .route("/api/players/:id", get(players::get_player))
        .route(
            "/api/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route("/api/tournaments/active", get(tournaments::get_active_tournaments))
        .route(
            "/api/tournaments/:id",
            get(tournaments::get_tournament).post(tournaments::edit_tournament),
        )
        .route("/api/tournaments/:id/matches", get(tournaments::get_tournament_matches))
        .route("/api/tournaments/:id/participants", post(tournaments::add_participant))
        .route("/api/tournaments/:id/opponent/:player_id", get(tournaments::find_opponent))
        .route("/api/matches", post(matches::create_match))
        .route("/api/matches/:id", get(matches::get_match))
        .route("/api/matches/:id/players", post(matches::enter_player))
        .route("/api/matches/:id/state", post(matches::transition_match))
        .route("/api/matches/:id/results", post(matches::record_result))
        .route("/api/admin/maintenance", post(admin::run_maintenance))
        .layer(middleware::from_fn_with_state(state.clone(), admission))
        .with_state(state)
}

/// Turn away mutating requests while maintenance holds the gate.
async fn admission(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if request.method() == Method::GET || state.engine.is_admitting() {
        return next.run(request).await;
    }

    let retry_after = state.config.maintenance.retry_after_secs.to_string();
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::RETRY_AFTER, retry_after)],
        Json(ErrorResponse {
            error: "Maintenance in progress".to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::AppConfig;
    use crate::database::{create_memory_pool, get_connection, setup};
    use crate::maintenance::AdmissionGate;
    use crate::services::{MaintenanceService, TournamentEngine};
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn test_state(admin_token: Option<&str>) -> (Arc<AppState>, AdmissionGate) {
        let pool = create_memory_pool().unwrap();
        setup::ensure_schema(&get_connection(&pool).unwrap()).unwrap();

        let now = NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let gate = AdmissionGate::new();
        let config = AppConfig {
            database_path: ":memory:".to_string(),
            admin_token: admin_token.map(str::to_string),
            engine: Default::default(),
            maintenance: Default::default(),
        };

        let engine = TournamentEngine::new(
            pool.clone(),
            clock.clone(),
            gate.clone(),
            config.engine.clone(),
        );
        let maintenance = Arc::new(MaintenanceService::new(
            pool,
            gate.clone(),
            clock,
            config.maintenance.clone(),
        ));
        let state = Arc::new(AppState {
            engine,
            maintenance,
            config,
        });
        (state, gate)
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = HttpRequest::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn registers_and_fetches_a_player() {
        let (state, _gate) = test_state(None);
        let app = create_router(state);

        let body = json!({"username": "alice"});
        let (status, created) = send(app.clone(), Method::POST, "/api/players", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["username"], "alice");
        assert_eq!(created["points"], 0);

        let uri = format!("/api/players/{}", created["id"]);
        let (status, fetched) = send(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["lastRated"], Value::Null);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let (state, _gate) = test_state(None);
        let app = create_router(state);

        let alice = json!({"username": "alice"});
        send(app.clone(), Method::POST, "/api/players", Some(alice.clone())).await;
        let (status, body) = send(app, Method::POST, "/api/players", Some(alice)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_player_is_not_found() {
        let (state, _gate) = test_state(None);
        let (status, _) = send(create_router(state), Method::GET, "/api/players/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn master_match_is_served_as_bracket() {
        let (state, _gate) = test_state(None);
        let app = create_router(state);

        let (status, created) =
            send(app.clone(), Method::POST, "/api/matches", Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["subs"].as_array().unwrap().len(), 3);
        assert_eq!(created["complete"], false);

        let uri = format!("/api/matches/{}", created["master"]["id"]);
        let (status, fetched) = send(app.clone(), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["master"]["kind"], "master");

        let uri = format!("/api/matches/{}", created["subs"][0]["id"]);
        let (_, sub) = send(app, Method::GET, &uri, None).await;
        assert_eq!(sub["kind"], "sub");
        assert_eq!(sub["state"], "ready");
    }

    #[tokio::test]
    async fn illegal_transition_conflicts() {
        let (state, _gate) = test_state(None);
        let app = create_router(state);

        let body = json!({"rounds": 1});
        let (_, created) = send(app.clone(), Method::POST, "/api/matches", Some(body)).await;
        let uri = format!("/api/matches/{}/state", created["subs"][0]["id"]);

        let finished = json!({"state": "finished"});
        let (status, _) = send(app.clone(), Method::POST, &uri, Some(finished)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(app, Method::POST, &uri, Some(json!({"state": "running"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn master_match_cannot_be_scored() {
        let (state, _gate) = test_state(None);
        let app = create_router(state);

        let body = json!({"username": "alice"});
        let (_, alice) = send(app.clone(), Method::POST, "/api/players", Some(body)).await;
        let body = json!({"rounds": 1});
        let (_, created) = send(app.clone(), Method::POST, "/api/matches", Some(body)).await;

        let uri = format!("/api/matches/{}/players", created["master"]["id"]);
        let body = json!({"playerId": alice["id"]});
        let (status, body) = send(app, Method::POST, &uri, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("master"));
    }

    async fn create_tournament(app: &Router) -> (Value, Value) {
        let body = json!({"username": "alice"});
        let (_, alice) = send(app.clone(), Method::POST, "/api/players", Some(body)).await;
        let body = json!({
            "name": "Spring Cup",
            "maintainerId": alice["id"],
            "startDate": "2024-08-01",
            "durationDays": 7,
            "players": [alice["id"]],
        });
        let (status, tournament) =
            send(app.clone(), Method::POST, "/api/tournaments", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        (alice, tournament)
    }

    #[tokio::test]
    async fn edits_and_fetches_a_tournament() {
        let (state, _gate) = test_state(None);
        let app = create_router(state);
        let (alice, tournament) = create_tournament(&app).await;

        let uri = format!("/api/tournaments/{}", tournament["id"]);
        let body = json!({
            "name": "Summer Cup",
            "maintainerId": alice["id"],
            "startDate": "2024-08-05",
            "durationDays": 3,
        });
        let (status, edited) = send(app.clone(), Method::POST, &uri, Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["name"], "Summer Cup");

        let (status, fetched) = send(app.clone(), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["startDate"], "2024-08-05");
        assert_eq!(fetched["durationDays"], 3);
        assert_eq!(fetched["participants"], json!([alice["id"]]));

        let (status, listed) = send(app.clone(), Method::GET, "/api/tournaments", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(app, Method::GET, "/api/tournaments/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tournament_matches_list_the_linked_bracket() {
        let (state, _gate) = test_state(None);
        let app = create_router(state);
        let (_, tournament) = create_tournament(&app).await;

        let body = json!({"tournamentId": tournament["id"], "rounds": 2});
        let (status, _) = send(app.clone(), Method::POST, "/api/matches", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/tournaments/{}/matches", tournament["id"]);
        let (status, matches) = send(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let kinds: Vec<&str> = matches
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["master", "sub", "sub"]);
    }

    #[tokio::test]
    async fn raised_gate_rejects_tournament_edits() {
        let (state, gate) = test_state(None);
        let app = create_router(state);
        let (alice, tournament) = create_tournament(&app).await;

        let uri = format!("/api/tournaments/{}", tournament["id"]);
        let body = json!({
            "name": "Renamed",
            "maintainerId": alice["id"],
            "startDate": "2024-08-01",
            "durationDays": 7,
        });
        let guard = gate.raise();
        let (status, _) = send(app.clone(), Method::POST, &uri, Some(body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        drop(guard);

        let (status, fetched) = send(app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Spring Cup");
    }

    #[tokio::test]
    async fn raised_gate_rejects_writes_but_serves_reads() {
        let (state, gate) = test_state(None);
        let app = create_router(state);
        let _guard = gate.raise();

        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/api/players")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"username": "bob"}).to_string()))
            .unwrap();
        let resp = app.clone().oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "60");

        let (status, body) = send(app, Method::GET, "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admitting"], false);
    }

    #[tokio::test]
    async fn admin_maintenance_requires_the_token() {
        let (state, _gate) = test_state(Some("s3cret"));
        let app = create_router(state);

        let (status, _) = send(app.clone(), Method::POST, "/api/admin/maintenance", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/api/admin/maintenance")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let report: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["failures"], json!([]));
    }

    #[tokio::test]
    async fn admin_maintenance_is_disabled_without_a_token() {
        let (state, _gate) = test_state(None);
        let app = create_router(state);
        let (status, _) = send(app, Method::POST, "/api/admin/maintenance", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
