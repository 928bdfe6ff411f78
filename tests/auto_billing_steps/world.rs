//! Shared world state for auto-billing BDD scenarios.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;
use timebill::{
    billing::{
        adapters::memory::InMemoryBillingStore,
        domain::{Project, TaskId, TimeEntryId, UserId},
        services::{BillingEngine, BillingError, TaskStatusUpdate},
    },
    config::BillingConfig,
};

/// Clock pinned to a scenario instant and advanced by steps.
#[derive(Debug)]
pub struct ScenarioClock {
    now: Mutex<DateTime<Utc>>,
}

impl ScenarioClock {
    /// Creates a clock reading Wednesday 4 March 2026, 09:00 UTC.
    #[must_use]
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 4, 9, 0, 0)
            .single()
            .expect("valid scenario start");
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().expect("clock lock");
        *now += Duration::seconds(seconds);
    }
}

impl Default for ScenarioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ScenarioClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// Engine type used by the BDD world.
pub type ScenarioEngine = BillingEngine<InMemoryBillingStore, ScenarioClock>;

/// Scenario world for auto-billing behaviour tests.
pub struct BillingWorld {
    pub store: Arc<InMemoryBillingStore>,
    pub clock: Arc<ScenarioClock>,
    pub engine: ScenarioEngine,
    pub user: UserId,
    pub project: Option<Project>,
    pub task: Option<TaskId>,
    pub running_entry: Option<TimeEntryId>,
    pub last_update: Option<TaskStatusUpdate>,
    pub last_error: Option<BillingError>,
}

impl BillingWorld {
    /// Creates a world with an empty store and default configuration.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryBillingStore::new());
        let clock = Arc::new(ScenarioClock::new());
        let engine = BillingEngine::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            BillingConfig::default(),
        );
        Self {
            store,
            clock,
            engine,
            user: UserId::new(),
            project: None,
            task: None,
            running_entry: None,
            last_update: None,
            last_error: None,
        }
    }

    /// Returns the task seeded by a given step.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been seeded.
    pub fn task_id(&self) -> Result<TaskId, eyre::Report> {
        self.task
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }
}

impl Default for BillingWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> BillingWorld {
    BillingWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
