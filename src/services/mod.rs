pub mod engine;
pub mod maintenance;
pub mod server;

pub use engine::TournamentEngine;
pub use maintenance::{MaintenanceReport, MaintenanceService, MaintenanceStep, StepFailure};
pub use server::ServerService;
