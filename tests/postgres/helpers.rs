//! Fixtures and seeding for `PostgreSQL` billing tests.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster};
use super::cluster::TemporaryDatabase;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::Clock;
use std::sync::{Arc, Mutex};
use timebill::{
    billing::{
        adapters::postgres::PostgresBillingStore,
        domain::{ProjectId, TaskId, UserId},
        services::BillingEngine,
    },
    config::BillingConfig,
};
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Schema applied to the template database.
pub const CREATE_BILLING_TABLES_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_billing_tables/up.sql");

/// Template database holding the migrated schema.
pub const TEMPLATE_DB: &str = "timebill_test_template";

/// Connections in each test's pool, enough for concurrent units of work.
pub const POOL_SIZE: u32 = 4;

/// Builds the runtime the synchronous tests drive the engine with.
pub fn test_runtime() -> Result<Runtime, BoxError> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| Box::new(err) as BoxError)
}

/// Clock that only moves when a test advances it.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock reading Wednesday 4 March 2026, 09:00 UTC.
    #[must_use]
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 4, 9, 0, 0)
            .single()
            .expect("valid start instant");
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        *self.now.lock().expect("clock lock") += Duration::seconds(seconds);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// Engine type under test.
pub type PgEngine = BillingEngine<PostgresBillingStore, ManualClock>;

/// A migrated database seeded with one freelancer, an hourly project at 80
/// per hour and one open task.
///
/// Fields drop in declaration order, so the pool closes before the database
/// is removed.
pub struct BillingDatabase {
    /// Engine wired to the store.
    pub engine: PgEngine,
    /// Store over the test pool.
    pub store: Arc<PostgresBillingStore>,
    /// Clock shared with the engine.
    pub clock: Arc<ManualClock>,
    /// Seeded account.
    pub user: UserId,
    /// Seeded hourly project.
    pub project: ProjectId,
    /// Seeded open task.
    pub task: TaskId,
    /// Runtime driving async calls.
    pub runtime: Runtime,
    database: TemporaryDatabase,
}

impl BillingDatabase {
    /// Opens a direct connection for seeding and assertions.
    pub fn connect(&self) -> PgConnection {
        PgConnection::establish(&self.database.url()).expect("direct connection")
    }

    /// Seeds another open task on the seeded project.
    pub fn add_task(&self, title: &str) -> TaskId {
        insert_task(&mut self.connect(), self.project, title)
    }

    /// Counts rows returned by `sql`, which must select `COUNT(*) AS n`.
    pub fn count(&self, sql: &str) -> i64 {
        #[derive(QueryableByName)]
        struct Counted {
            #[diesel(sql_type = diesel::sql_types::BigInt)]
            n: i64,
        }

        diesel::sql_query(sql)
            .get_result::<Counted>(&mut self.connect())
            .expect("count query")
            .n
    }
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut conn = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    conn.batch_execute(CREATE_BILLING_TABLES_SQL)
        .map_err(|err| Box::new(err) as BoxError)
}

/// Creates a database from the migrated template and seeds a freelancer.
pub fn billing_database(cluster: PostgresCluster) -> Result<BillingDatabase, BoxError> {
    cluster.ensure_template_exists(TEMPLATE_DB, apply_migrations)?;
    let database = cluster
        .temporary_database_from_template(&format!("billing_{}", Uuid::new_v4()), TEMPLATE_DB)?;
    let pool = Pool::builder()
        .max_size(POOL_SIZE)
        .build(ConnectionManager::<PgConnection>::new(database.url()))
        .map_err(|err| Box::new(err) as BoxError)?;

    let mut conn =
        PgConnection::establish(&database.url()).map_err(|err| Box::new(err) as BoxError)?;
    let user = UserId::new();
    diesel::sql_query("INSERT INTO users (id, currency) VALUES ($1, 'EUR')")
        .bind::<diesel::sql_types::Uuid, _>(user.into_inner())
        .execute(&mut conn)
        .map_err(|err| Box::new(err) as BoxError)?;
    let project = ProjectId::new();
    diesel::sql_query(concat!(
        "INSERT INTO projects (id, user_id, client_id, name, status, billing_type, hourly_rate) ",
        "VALUES ($1, $2, $3, 'Client portal', 'in_progress', 'hourly', 80)",
    ))
    .bind::<diesel::sql_types::Uuid, _>(project.into_inner())
    .bind::<diesel::sql_types::Uuid, _>(user.into_inner())
    .bind::<diesel::sql_types::Uuid, _>(Uuid::new_v4())
    .execute(&mut conn)
    .map_err(|err| Box::new(err) as BoxError)?;
    let task = insert_task(&mut conn, project, "Login flow");

    let store = Arc::new(PostgresBillingStore::new(pool));
    let clock = Arc::new(ManualClock::new());
    let engine = BillingEngine::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        BillingConfig::default(),
    );
    Ok(BillingDatabase {
        engine,
        store,
        clock,
        user,
        project,
        task,
        runtime: test_runtime()?,
        database,
    })
}

fn insert_task(conn: &mut PgConnection, project: ProjectId, title: &str) -> TaskId {
    let task = TaskId::new();
    diesel::sql_query("INSERT INTO tasks (id, project_id, title) VALUES ($1, $2, $3)")
        .bind::<diesel::sql_types::Uuid, _>(task.into_inner())
        .bind::<diesel::sql_types::Uuid, _>(project.into_inner())
        .bind::<diesel::sql_types::Text, _>(title)
        .execute(conn)
        .expect("seed task");
    task
}
