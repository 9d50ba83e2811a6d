use anyhow::Result;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::{create_router, AppState};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::database::{self, setup};
use crate::maintenance::{AdmissionGate, MaintenanceScheduler};
use crate::services::{MaintenanceService, TournamentEngine};

pub struct ServerService {
    port: u16,
    config: AppConfig,
}

impl ServerService {
    pub fn new(port: u16, config: AppConfig) -> Self {
        Self { port, config }
    }

    pub async fn run(&self) -> Result<()> {
        let pool = database::create_pool(&self.config.database_path)?;
        setup::ensure_schema(&*database::get_connection(&pool)?)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let gate = AdmissionGate::new();

        let engine = TournamentEngine::new(
            pool.clone(),
            clock.clone(),
            gate.clone(),
            self.config.engine.clone(),
        );
        let maintenance = Arc::new(MaintenanceService::new(
            pool.clone(),
            gate,
            clock.clone(),
            self.config.maintenance.clone(),
        ));

        let scheduler = MaintenanceScheduler::new(
            Arc::clone(&maintenance),
            pool,
            clock,
            self.config.maintenance.run_at,
        )
        .spawn();

        let state = Arc::new(AppState {
            engine,
            maintenance,
            config: self.config.clone(),
        });

        let app = create_router(state).layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        scheduler.shutdown();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
