use std::fmt;
use std::sync::{Arc, Mutex, TryLockError};

use chrono::NaiveDate;
use log::{error, info, warn};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::MaintenanceSettings;
use crate::database::{self, players, setup, tiers, DbPool};
use crate::errors::EngineError;
use crate::maintenance::AdmissionGate;
use crate::rating;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MaintenanceStep {
    Rankings,
    TopTier,
    Housekeeping,
}

impl fmt::Display for MaintenanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MaintenanceStep::Rankings => "rankings",
            MaintenanceStep::TopTier => "top tier",
            MaintenanceStep::Housekeeping => "housekeeping",
        };
        f.write_str(name)
    }
}

/// A recompute step that failed; logged and kept in the report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailure {
    pub step: MaintenanceStep,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub run_date: NaiveDate,
    pub players_rated: usize,
    pub tiers_attached: usize,
    pub housekeeping_done: bool,
    pub failures: Vec<StepFailure>,
}

impl MaintenanceReport {
    fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            players_rated: 0,
            tiers_attached: 0,
            housekeeping_done: false,
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, step: MaintenanceStep, err: EngineError) {
        error!("Maintenance step {} failed: {:?}", step, err);
        self.failures.push(StepFailure {
            step,
            error: err.to_string(),
        });
    }
}

/// The daily maintenance run: rankings, top tier markers and housekeeping
/// behind the admission gate.
pub struct MaintenanceService {
    pool: DbPool,
    gate: AdmissionGate,
    clock: Arc<dyn Clock>,
    settings: MaintenanceSettings,
    running: Mutex<()>,
}

impl MaintenanceService {
    pub fn new(
        pool: DbPool,
        gate: AdmissionGate,
        clock: Arc<dyn Clock>,
        settings: MaintenanceSettings,
    ) -> Self {
        Self {
            pool,
            gate,
            clock,
            settings,
            running: Mutex::new(()),
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Execute one run. Step failures end up in the report; the only error
    /// returned is `MaintenanceInProgress` when another run holds the lock.
    pub fn run(&self) -> Result<MaintenanceReport, EngineError> {
        let _running = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(EngineError::MaintenanceInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let today = self.clock.today();
        info!("=== Starting Maintenance ({}) ===", today);

        let mut report = MaintenanceReport::new(today);
        {
            let _gate = self.gate.raise();

            // Step 1: Recompute every player's points
            match self.recompute_rankings(today) {
                Ok(rated) => {
                    report.players_rated = rated;
                    info!("  → Rated {} players", rated);

                    // Step 2: Mark the top of the leaderboard
                    match self.assign_top_tier() {
                        Ok(attached) => {
                            report.tiers_attached = attached;
                            info!(
                                "  → Attached '{}' to {} players",
                                self.settings.top_tier_marker, attached
                            );
                        }
                        Err(e) => report.record_failure(MaintenanceStep::TopTier, e),
                    }
                }
                Err(e) => {
                    report.record_failure(MaintenanceStep::Rankings, e);
                    warn!("  → Skipping top tier assignment, rankings are stale");
                }
            }

            // Step 3: Housekeeping is advisory
            match self.housekeeping() {
                Ok(()) => report.housekeeping_done = true,
                Err(e) => report.record_failure(MaintenanceStep::Housekeeping, e),
            }
        }

        info!("=== Maintenance Complete ({} failures) ===", report.failures.len());
        Ok(report)
    }

    fn recompute_rankings(&self, today: NaiveDate) -> Result<usize, EngineError> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction()?;

        let player_ids = players::list_ids(&tx)?;
        for player_id in &player_ids {
            rating::rate_player(&tx, *player_id, today)?;
        }

        tx.commit()?;
        Ok(player_ids.len())
    }

    fn assign_top_tier(&self) -> Result<usize, EngineError> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction()?;

        let tier_id = tiers::ensure_tier(&tx, &self.settings.top_tier_marker)?;
        let top = rating::leaderboard(&tx, self.settings.top_tier_limit)?;

        let mut attached = 0;
        for entry in &top {
            if tiers::attach(&tx, entry.player_id, tier_id)? {
                attached += 1;
            }
        }

        tx.commit()?;
        Ok(attached)
    }

    fn housekeeping(&self) -> Result<(), EngineError> {
        let conn = database::get_connection(&self.pool)?;
        setup::vacuum(&conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::{create_memory_pool, get_connection, matches};
    use crate::domain::{MatchKind, MatchResult, MatchState, Placement, PlayerId};
    use chrono::NaiveDateTime;
    use std::time::{Duration, Instant};

    fn noon(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn setup_service(settings: MaintenanceSettings) -> (DbPool, Arc<MaintenanceService>) {
        let pool = create_memory_pool().unwrap();
        setup::ensure_schema(&get_connection(&pool).unwrap()).unwrap();
        let clock = Arc::new(FixedClock::new(noon(1)));
        let service = MaintenanceService::new(pool.clone(), AdmissionGate::new(), clock, settings);
        (pool, Arc::new(service))
    }

    fn finished_match(pool: &DbPool, results: &[(PlayerId, u8)]) {
        let conn = get_connection(pool).unwrap();
        let id = matches::insert_match(&conn, MatchKind::Sub, noon(1).date(), None).unwrap();
        let results: Vec<MatchResult> = results
            .iter()
            .map(|&(player_id, p)| MatchResult {
                player_id,
                placement: Placement::new(p).unwrap(),
            })
            .collect();
        matches::insert_results(&conn, id, &results).unwrap();
        matches::update_state(&conn, id, MatchState::Finished).unwrap();
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn rates_players_and_marks_the_top() {
        let settings = MaintenanceSettings {
            top_tier_limit: 1,
            ..MaintenanceSettings::default()
        };
        let (pool, service) = setup_service(settings);
        let (alice, bob) = {
            let conn = get_connection(&pool).unwrap();
            (
                players::insert_player(&conn, "alice").unwrap(),
                players::insert_player(&conn, "bob").unwrap(),
            )
        };
        finished_match(&pool, &[(alice.id, 4), (bob.id, 1)]);

        let report = service.run().unwrap();

        assert!(report.is_success());
        assert_eq!(report.players_rated, 2);
        assert_eq!(report.tiers_attached, 1);
        assert!(report.housekeeping_done);

        let conn = get_connection(&pool).unwrap();
        let alice = players::find_by_id(&conn, alice.id).unwrap().unwrap();
        let bob = players::find_by_id(&conn, bob.id).unwrap().unwrap();
        assert_eq!((alice.points, bob.points), (2, -1));
        assert_eq!(alice.last_rated, Some(noon(1).date()));
        assert_eq!(alice.tiers, vec!["Top 100".to_string()]);
        assert!(bob.tiers.is_empty());
    }

    #[test]
    fn repeated_runs_do_not_duplicate_markers() {
        let (pool, service) = setup_service(MaintenanceSettings::default());
        let alice = players::insert_player(&get_connection(&pool).unwrap(), "alice").unwrap();

        service.run().unwrap();
        let second = service.run().unwrap();

        assert_eq!(second.tiers_attached, 0);
        let conn = get_connection(&pool).unwrap();
        assert_eq!(tiers::list_for_player(&conn, alice.id).unwrap().len(), 1);
    }

    #[test]
    fn failed_recompute_is_reported_and_gate_reopens() {
        let (pool, service) = setup_service(MaintenanceSettings::default());
        {
            let conn = get_connection(&pool).unwrap();
            players::insert_player(&conn, "alice").unwrap();
            conn.execute_batch("DROP TABLE match_results").unwrap();
        }

        let report = service.run().unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, MaintenanceStep::Rankings);
        assert_eq!(report.tiers_attached, 0);
        assert!(report.housekeeping_done);
        assert!(service.gate().is_admitting());
    }

    #[test]
    fn gate_stays_raised_for_the_whole_run() {
        let (pool, service) = setup_service(MaintenanceSettings::default());
        players::insert_player(&get_connection(&pool).unwrap(), "alice").unwrap();

        // Holding the only connection parks the run right after it raises the gate.
        let held = get_connection(&pool).unwrap();
        let worker = {
            let service = Arc::clone(&service);
            std::thread::spawn(move || service.run())
        };

        wait_until(|| !service.gate().is_admitting());
        std::thread::sleep(Duration::from_millis(50));
        assert!(!service.gate().is_admitting());
        assert!(matches!(service.run(), Err(EngineError::MaintenanceInProgress)));

        drop(held);
        let report = worker.join().unwrap().unwrap();

        assert!(report.is_success());
        assert!(service.gate().is_admitting());
    }
}
