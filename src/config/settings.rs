use chrono::NaiveTime;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub default_rounds: usize,
    pub leaderboard_limit: usize,
    pub max_leaderboard_limit: usize,
    pub active_tournaments_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_rounds: 3,
            leaderboard_limit: 100,
            max_leaderboard_limit: 1000,
            active_tournaments_limit: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaintenanceSettings {
    /// Local wall-clock time of the daily run
    pub run_at: NaiveTime,
    pub top_tier_limit: usize,
    pub top_tier_marker: String,
    /// Hint sent to clients rejected while the gate is raised
    pub retry_after_secs: u64,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            run_at: NaiveTime::from_hms_opt(3, 0, 0).unwrap_or(NaiveTime::MIN),
            top_tier_limit: 100,
            top_tier_marker: "Top 100".to_string(),
            retry_after_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub admin_token: Option<String>,
    pub engine: EngineSettings,
    pub maintenance: MaintenanceSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "penta_tournament.db".to_string()),
            admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            engine: EngineSettings::default(),
            maintenance: MaintenanceSettings::default(),
        }
    }
}
