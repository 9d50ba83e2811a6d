use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{MaintenanceService, TournamentEngine};

pub mod admin;
pub mod matches;
pub mod players;
pub mod tournaments;

pub struct AppState {
    pub engine: TournamentEngine,
    pub maintenance: Arc<MaintenanceService>,
    pub config: AppConfig,
}
