//! Shared fixtures for billing unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;
use rust_decimal::Decimal;

use crate::billing::{
    adapters::memory::InMemoryBillingStore,
    domain::{
        BillingProfile, BillingType, ClientId, Currency, Invoice, InvoiceId, InvoiceItem,
        InvoiceItemId, InvoiceKind, NewDraftInvoice, PersistedTaskData, Project, ProjectId,
        ProjectStatus, Task, TaskId, TaskStatus, TimeEntry, TimeEntryId, UserId,
    },
    ports::{BillingStore, BillingTransaction, StoreError, StoreResult, TimeEntryFilter},
    services::BillingEngine,
};
use crate::config::BillingConfig;

/// Clock that only moves when told to.
#[derive(Debug)]
pub(super) struct StubClock {
    now: Mutex<DateTime<Utc>>,
}

impl StubClock {
    pub(super) const fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().expect("clock lock");
        *now += Duration::seconds(seconds);
    }

    pub(super) fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().expect("clock lock") = instant;
    }
}

impl Clock for StubClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub(super) fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

/// Wednesday 4 March 2026, 09:00 UTC.
pub(super) fn base_time() -> DateTime<Utc> {
    utc(2026, 3, 4, 9, 0)
}

pub(super) fn project_for(user: UserId, billing_type: BillingType) -> Project {
    Project {
        id: ProjectId::new(),
        user_id: user,
        client_id: ClientId::new(),
        name: "Website redesign".to_owned(),
        status: ProjectStatus::InProgress,
        billing_type,
        hourly_rate: None,
        fixed_amount: None,
    }
}

pub(super) fn task_with_hours(
    project_id: ProjectId,
    title: &str,
    status: TaskStatus,
    hours_worked: Decimal,
    hourly_rate: Option<Decimal>,
) -> Task {
    Task::from_persisted(PersistedTaskData {
        id: TaskId::new(),
        project_id,
        title: title.to_owned(),
        status,
        hours_worked,
        hourly_rate,
        is_billed: false,
        created_at: base_time(),
        updated_at: base_time(),
    })
}

pub(super) type TestEngine = BillingEngine<InMemoryBillingStore, StubClock>;

/// One user with a profile and an hourly project, wired to an engine.
pub(super) struct Harness {
    pub(super) store: Arc<InMemoryBillingStore>,
    pub(super) clock: Arc<StubClock>,
    pub(super) engine: TestEngine,
    pub(super) user: UserId,
    pub(super) project: Project,
}

impl Harness {
    pub(super) fn with_config(config: BillingConfig) -> Self {
        let store = Arc::new(InMemoryBillingStore::new());
        let clock = Arc::new(StubClock::at(base_time()));
        let user = UserId::new();
        store
            .insert_profile(BillingProfile::new(user))
            .expect("seed profile");
        let project = project_for(user, BillingType::Hourly);
        store.insert_project(project.clone()).expect("seed project");
        let engine = BillingEngine::new(Arc::clone(&store), Arc::clone(&clock), config);
        Self {
            store,
            clock,
            engine,
            user,
            project,
        }
    }

    pub(super) fn add_task(&self, title: &str) -> Task {
        let task = Task::new(self.project.id, title, &*self.clock);
        self.seed_task(task.clone());
        task
    }

    pub(super) fn seed_task(&self, task: Task) {
        self.store.insert_task(task).expect("seed task");
    }

    pub(super) fn seed_project(&self, project: Project) {
        self.store.insert_project(project).expect("seed project");
    }

    pub(super) fn update_project(&self, update: impl FnOnce(&mut Project)) -> Project {
        let mut project = self.project.clone();
        update(&mut project);
        self.seed_project(project.clone());
        project
    }

    /// Stores an empty manual invoice numbered through the engine.
    pub(super) async fn open_invoice(&self) -> Invoice {
        let number = self
            .engine
            .numbering()
            .generate_invoice_number(self.user)
            .await
            .expect("number issued");
        let invoice = Invoice::draft(
            NewDraftInvoice {
                user_id: self.user,
                client_id: self.project.client_id,
                project_id: None,
                number,
                kind: InvoiceKind::Manual,
                currency: Currency::Eur,
                due_date: base_time() + Duration::days(30),
                notes: None,
            },
            &*self.clock,
        );
        let stored = invoice.clone();
        self.store
            .transaction(move |tx| tx.insert_invoice(&stored))
            .await
            .expect("invoice stored");
        invoice
    }

    pub(super) fn task(&self, task_id: TaskId) -> Task {
        self.store
            .task(task_id)
            .expect("task lookup")
            .expect("task should exist")
    }
}

#[fixture]
pub(super) fn harness() -> Harness {
    Harness::with_config(BillingConfig::default())
}

/// Store whose transactions fail on every invoice item insert.
///
/// Shares state with the wrapped store so tests can check that nothing from
/// the failed unit of work was committed.
#[derive(Debug, Clone)]
pub(super) struct FailingItemStore {
    inner: InMemoryBillingStore,
}

impl FailingItemStore {
    pub(super) fn wrapping(inner: &InMemoryBillingStore) -> Self {
        Self {
            inner: inner.clone(),
        }
    }
}

#[async_trait]
impl BillingStore for FailingItemStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn BillingTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        self.inner
            .transaction(move |tx| work(&mut FailingItemInserts { inner: tx }))
            .await
    }
}

struct FailingItemInserts<'tx> {
    inner: &'tx mut dyn BillingTransaction,
}

impl BillingTransaction for FailingItemInserts<'_> {
    fn find_profile(&mut self, user_id: UserId) -> StoreResult<Option<BillingProfile>> {
        self.inner.find_profile(user_id)
    }

    fn find_project(&mut self, project_id: ProjectId) -> StoreResult<Option<Project>> {
        self.inner.find_project(project_id)
    }

    fn find_task(&mut self, task_id: TaskId) -> StoreResult<Option<Task>> {
        self.inner.find_task(task_id)
    }

    fn billable_tasks(&mut self, project_id: ProjectId) -> StoreResult<Vec<Task>> {
        self.inner.billable_tasks(project_id)
    }

    fn update_task(&mut self, task: &Task) -> StoreResult<()> {
        self.inner.update_task(task)
    }

    fn running_entry(&mut self, user_id: UserId) -> StoreResult<Option<TimeEntry>> {
        self.inner.running_entry(user_id)
    }

    fn find_entry(&mut self, entry_id: TimeEntryId) -> StoreResult<Option<TimeEntry>> {
        self.inner.find_entry(entry_id)
    }

    fn find_entries(&mut self, filter: &TimeEntryFilter) -> StoreResult<Vec<TimeEntry>> {
        self.inner.find_entries(filter)
    }

    fn count_entries(&mut self, filter: &TimeEntryFilter) -> StoreResult<u64> {
        self.inner.count_entries(filter)
    }

    fn find_entries_page(
        &mut self,
        filter: &TimeEntryFilter,
        offset: u64,
        limit: u32,
    ) -> StoreResult<Vec<TimeEntry>> {
        self.inner.find_entries_page(filter, offset, limit)
    }

    fn insert_entry(&mut self, entry: &TimeEntry) -> StoreResult<()> {
        self.inner.insert_entry(entry)
    }

    fn update_entry(&mut self, entry: &TimeEntry) -> StoreResult<()> {
        self.inner.update_entry(entry)
    }

    fn delete_entry(&mut self, entry_id: TimeEntryId) -> StoreResult<()> {
        self.inner.delete_entry(entry_id)
    }

    fn find_invoice(&mut self, invoice_id: InvoiceId) -> StoreResult<Option<Invoice>> {
        self.inner.find_invoice(invoice_id)
    }

    fn find_draft_invoice(
        &mut self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> StoreResult<Option<Invoice>> {
        self.inner.find_draft_invoice(user_id, project_id)
    }

    fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        self.inner.insert_invoice(invoice)
    }

    fn update_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        self.inner.update_invoice(invoice)
    }

    fn next_invoice_sequence(&mut self, user_id: UserId, year: i32) -> StoreResult<u32> {
        self.inner.next_invoice_sequence(user_id, year)
    }

    fn find_item(&mut self, item_id: InvoiceItemId) -> StoreResult<Option<InvoiceItem>> {
        self.inner.find_item(item_id)
    }

    fn invoice_items(&mut self, invoice_id: InvoiceId) -> StoreResult<Vec<InvoiceItem>> {
        self.inner.invoice_items(invoice_id)
    }

    fn insert_item(&mut self, _item: &InvoiceItem) -> StoreResult<()> {
        Err(StoreError::persistence(std::io::Error::other(
            "invoice_items is read-only",
        )))
    }

    fn update_item(&mut self, item: &InvoiceItem) -> StoreResult<()> {
        self.inner.update_item(item)
    }

    fn delete_item(&mut self, item_id: InvoiceItemId) -> StoreResult<()> {
        self.inner.delete_item(item_id)
    }
}
