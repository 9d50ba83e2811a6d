use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::database::{self, schedule, DbPool};
use crate::errors::EngineError;
use crate::services::maintenance::MaintenanceService;

/// Upper bound on a single sleep so clock jumps are noticed within the hour.
const MAX_SLEEP: StdDuration = StdDuration::from_secs(60 * 60);

/// First run time strictly after `now` at the wall-clock time `run_at`.
pub fn first_due_after(now: NaiveDateTime, run_at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(run_at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Advance `due` by whole days until it lies after `now`.
///
/// Missed days are collapsed into a single run.
pub fn next_due_after(due: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    let mut next = due + Duration::days(1);
    while next <= now {
        next += Duration::days(1);
    }
    next
}

pub struct MaintenanceScheduler {
    service: Arc<MaintenanceService>,
    pool: DbPool,
    clock: Arc<dyn Clock>,
    run_at: NaiveTime,
}

pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop. An in-flight run is not awaited.
    pub fn shutdown(self) {
        self.task.abort();
        info!("Maintenance scheduler stopped");
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl MaintenanceScheduler {
    pub fn new(
        service: Arc<MaintenanceService>,
        pool: DbPool,
        clock: Arc<dyn Clock>,
        run_at: NaiveTime,
    ) -> Self {
        Self {
            service,
            pool,
            clock,
            run_at,
        }
    }

    pub fn spawn(self) -> SchedulerHandle {
        let task = tokio::spawn(self.run_loop());
        SchedulerHandle { task }
    }

    /// Runs until aborted. Storage errors are logged and the in-memory due
    /// time keeps the schedule going; persisting is retried on every wake.
    async fn run_loop(self) {
        let (mut due, mut persisted) = match self.load_due() {
            Ok(Some(due)) => (due, true),
            Ok(None) => (first_due_after(self.clock.now(), self.run_at), false),
            Err(e) => {
                error!("Could not load maintenance schedule: {:?}", e);
                (first_due_after(self.clock.now(), self.run_at), false)
            }
        };
        info!("Next maintenance due at {}", due);

        loop {
            if !persisted {
                persisted = self.persist_due(due);
            }

            let now = self.clock.now();
            if now < due {
                let wait = (due - now).to_std().unwrap_or(StdDuration::ZERO);
                tokio::time::sleep(wait.min(MAX_SLEEP)).await;
                continue;
            }

            self.run_once().await;

            due = next_due_after(due, self.clock.now());
            info!("Next maintenance due at {}", due);
            persisted = self.persist_due(due);
        }
    }

    async fn run_once(&self) {
        let service = Arc::clone(&self.service);
        match tokio::task::spawn_blocking(move || service.run()).await {
            Ok(Ok(report)) if report.is_success() => {
                info!("Scheduled maintenance finished for {}", report.run_date);
            }
            Ok(Ok(report)) => {
                warn!(
                    "Scheduled maintenance for {} finished with {} failed steps",
                    report.run_date,
                    report.failures.len()
                );
            }
            Ok(Err(EngineError::MaintenanceInProgress)) => {
                warn!("Skipping scheduled maintenance, a run is already in progress");
            }
            Ok(Err(e)) => error!("Scheduled maintenance failed: {:?}", e),
            Err(e) => error!("Maintenance task panicked: {:?}", e),
        }
    }

    fn load_due(&self) -> Result<Option<NaiveDateTime>> {
        let conn = database::get_connection(&self.pool)?;
        schedule::load_next_due(&conn)
    }

    fn persist_due(&self, due: NaiveDateTime) -> bool {
        let stored = database::get_connection(&self.pool)
            .and_then(|conn| schedule::store_next_due(&conn, due))
            .context("Failed to persist next maintenance time");

        match stored {
            Ok(()) => true,
            Err(e) => {
                warn!("{:?}; will retry", e);
                false
            }
        }
    }
}
