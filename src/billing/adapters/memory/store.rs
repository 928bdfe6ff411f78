//! In-memory billing store for tests and single-process use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::billing::{
    domain::{
        BillingProfile, Invoice, InvoiceId, InvoiceItem, InvoiceItemId, InvoiceStatus, Project,
        ProjectId, Task, TaskId, TimeEntry, TimeEntryId, UserId,
    },
    ports::{BillingStore, BillingTransaction, StoreError, StoreResult, TimeEntryFilter},
};

/// Thread-safe in-memory billing store.
///
/// Units of work run one at a time against a private copy of the state; the
/// copy replaces the shared state only when the unit of work succeeds.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    state: Arc<Mutex<BillingState>>,
}

#[derive(Debug, Clone, Default)]
struct BillingState {
    profiles: HashMap<UserId, BillingProfile>,
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
    entries: HashMap<TimeEntryId, TimeEntry>,
    invoices: HashMap<InvoiceId, Invoice>,
    items: Vec<InvoiceItem>,
    sequences: HashMap<(UserId, i32), u32>,
}

impl InMemoryBillingStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a user's billing profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the store lock is poisoned.
    pub fn insert_profile(&self, profile: BillingProfile) -> StoreResult<()> {
        self.lock()?.profiles.insert(profile.user_id, profile);
        Ok(())
    }

    /// Seeds or replaces a project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the store lock is poisoned.
    pub fn insert_project(&self, project: Project) -> StoreResult<()> {
        self.lock()?.projects.insert(project.id, project);
        Ok(())
    }

    /// Seeds or replaces a task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRecord`] when the task's project has not
    /// been seeded.
    pub fn insert_task(&self, task: Task) -> StoreResult<()> {
        let mut state = self.lock()?;
        if !state.projects.contains_key(&task.project_id()) {
            return Err(StoreError::missing("project", task.project_id()));
        }
        state.tasks.insert(task.id(), task);
        Ok(())
    }

    /// Returns the committed copy of a task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the store lock is poisoned.
    pub fn task(&self, task_id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.lock()?.tasks.get(&task_id).cloned())
    }

    /// Returns the committed invoices of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the store lock is poisoned.
    pub fn invoices_for_user(&self, user_id: UserId) -> StoreResult<Vec<Invoice>> {
        let state = self.lock()?;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|invoice| invoice.is_owned_by(user_id))
            .cloned()
            .collect();
        invoices.sort_by_key(|invoice| (invoice.created_at(), invoice.number().sequence()));
        Ok(invoices)
    }

    /// Returns the committed time entries of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the store lock is poisoned.
    pub fn entries_for_user(&self, user_id: UserId) -> StoreResult<Vec<TimeEntry>> {
        let mut state = self.lock()?;
        state.find_entries(&TimeEntryFilter::for_user(user_id))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BillingState>> {
        self.state
            .lock()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn run<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn BillingTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut state = self.lock()?;
        let mut staged = state.clone();
        let value = work(&mut staged)?;
        *state = staged;
        Ok(value)
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn BillingTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        self.run(work)
    }
}

impl BillingTransaction for BillingState {
    fn find_profile(&mut self, user_id: UserId) -> StoreResult<Option<BillingProfile>> {
        Ok(self.profiles.get(&user_id).cloned())
    }

    fn find_project(&mut self, project_id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.projects.get(&project_id).cloned())
    }

    fn find_task(&mut self, task_id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.tasks.get(&task_id).cloned())
    }

    fn billable_tasks(&mut self, project_id: ProjectId) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|task| task.project_id() == project_id && task.is_billable())
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks)
    }

    fn update_task(&mut self, task: &Task) -> StoreResult<()> {
        let slot = self
            .tasks
            .get_mut(&task.id())
            .ok_or_else(|| StoreError::missing("task", task.id()))?;
        *slot = task.clone();
        Ok(())
    }

    fn running_entry(&mut self, user_id: UserId) -> StoreResult<Option<TimeEntry>> {
        Ok(self
            .entries
            .values()
            .find(|entry| entry.user_id() == user_id && entry.is_running())
            .cloned())
    }

    fn find_entry(&mut self, entry_id: TimeEntryId) -> StoreResult<Option<TimeEntry>> {
        Ok(self.entries.get(&entry_id).cloned())
    }

    fn find_entries(&mut self, filter: &TimeEntryFilter) -> StoreResult<Vec<TimeEntry>> {
        let mut entries: Vec<TimeEntry> = self
            .entries
            .values()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        entries.sort_by(|left, right| {
            right
                .start_time()
                .cmp(&left.start_time())
                .then_with(|| right.id().cmp(&left.id()))
        });
        Ok(entries)
    }

    fn count_entries(&mut self, filter: &TimeEntryFilter) -> StoreResult<u64> {
        let matching = self
            .entries
            .values()
            .filter(|entry| filter.matches(entry))
            .count();
        Ok(u64::try_from(matching).unwrap_or(u64::MAX))
    }

    fn find_entries_page(
        &mut self,
        filter: &TimeEntryFilter,
        offset: u64,
        limit: u32,
    ) -> StoreResult<Vec<TimeEntry>> {
        let skipped = usize::try_from(offset).unwrap_or(usize::MAX);
        let taken = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .find_entries(filter)?
            .into_iter()
            .skip(skipped)
            .take(taken)
            .collect())
    }

    fn insert_entry(&mut self, entry: &TimeEntry) -> StoreResult<()> {
        if entry.is_running() && self.running_entry(entry.user_id())?.is_some() {
            return Err(StoreError::RunningTimerExists(entry.user_id()));
        }
        self.entries.insert(entry.id(), entry.clone());
        Ok(())
    }

    fn update_entry(&mut self, entry: &TimeEntry) -> StoreResult<()> {
        let slot = self
            .entries
            .get_mut(&entry.id())
            .ok_or_else(|| StoreError::missing("time entry", entry.id()))?;
        *slot = entry.clone();
        Ok(())
    }

    fn delete_entry(&mut self, entry_id: TimeEntryId) -> StoreResult<()> {
        self.entries
            .remove(&entry_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::missing("time entry", entry_id))
    }

    fn find_invoice(&mut self, invoice_id: InvoiceId) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices.get(&invoice_id).cloned())
    }

    fn find_draft_invoice(
        &mut self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> StoreResult<Option<Invoice>> {
        Ok(self
            .invoices
            .values()
            .filter(|invoice| {
                invoice.is_owned_by(user_id)
                    && invoice.project_id() == Some(project_id)
                    && invoice.status() == InvoiceStatus::Draft
            })
            .min_by_key(|invoice| (invoice.created_at(), invoice.id()))
            .cloned())
    }

    fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        let duplicate = self.invoices.values().any(|existing| {
            existing.user_id() == invoice.user_id() && existing.number() == invoice.number()
        });
        if duplicate {
            return Err(StoreError::DuplicateInvoiceNumber(
                invoice.number().to_string(),
            ));
        }
        self.invoices.insert(invoice.id(), invoice.clone());
        Ok(())
    }

    fn update_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        let slot = self
            .invoices
            .get_mut(&invoice.id())
            .ok_or_else(|| StoreError::missing("invoice", invoice.id()))?;
        *slot = invoice.clone();
        Ok(())
    }

    fn next_invoice_sequence(&mut self, user_id: UserId, year: i32) -> StoreResult<u32> {
        let counter = self.sequences.entry((user_id, year)).or_insert(0);
        *counter = counter.saturating_add(1);
        Ok(*counter)
    }

    fn find_item(&mut self, item_id: InvoiceItemId) -> StoreResult<Option<InvoiceItem>> {
        Ok(self.items.iter().find(|item| item.id() == item_id).cloned())
    }

    fn invoice_items(&mut self, invoice_id: InvoiceId) -> StoreResult<Vec<InvoiceItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.invoice_id() == invoice_id)
            .cloned()
            .collect())
    }

    fn insert_item(&mut self, item: &InvoiceItem) -> StoreResult<()> {
        if !self.invoices.contains_key(&item.invoice_id()) {
            return Err(StoreError::missing("invoice", item.invoice_id()));
        }
        self.items.push(item.clone());
        Ok(())
    }

    fn update_item(&mut self, item: &InvoiceItem) -> StoreResult<()> {
        let slot = self
            .items
            .iter_mut()
            .find(|existing| existing.id() == item.id())
            .ok_or_else(|| StoreError::missing("invoice item", item.id()))?;
        *slot = item.clone();
        Ok(())
    }

    fn delete_item(&mut self, item_id: InvoiceItemId) -> StoreResult<()> {
        let position = self
            .items
            .iter()
            .position(|item| item.id() == item_id)
            .ok_or_else(|| StoreError::missing("invoice item", item_id))?;
        self.items.remove(position);
        Ok(())
    }
}
