pub mod settings;

pub use settings::{AppConfig, EngineSettings, MaintenanceSettings};
