//! Unit-of-work port for billing persistence.
//!
//! Every billing operation that touches more than one row runs inside a
//! single [`BillingStore::transaction`] call. The closure receives a
//! [`BillingTransaction`] view of the store; returning `Ok` commits every
//! write made through it, returning `Err` discards all of them.

use crate::billing::domain::{
    BillingProfile, Invoice, InvoiceId, InvoiceItem, InvoiceItemId, Project, ProjectId, Task,
    TaskId, TimeEntry, TimeEntryId, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Selection criteria for time entries.
///
/// Matching entries are returned newest first by start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEntryFilter {
    /// Owner of the entries.
    pub user_id: UserId,
    /// Restrict to one task.
    pub task_id: Option<TaskId>,
    /// Inclusive lower bound on start time.
    pub started_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on start time.
    pub started_to: Option<DateTime<Utc>>,
    /// Restrict to stopped entries.
    pub completed_only: bool,
}

impl TimeEntryFilter {
    /// Matches every entry of `user_id`.
    #[must_use]
    pub const fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            task_id: None,
            started_from: None,
            started_to: None,
            completed_only: false,
        }
    }

    /// Restricts the filter to one task.
    #[must_use]
    pub const fn on_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Restricts the filter to stopped entries.
    #[must_use]
    pub const fn completed(mut self) -> Self {
        self.completed_only = true;
        self
    }

    /// Restricts the filter to entries started within the given bounds.
    #[must_use]
    pub const fn started_between(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.started_from = from;
        self.started_to = to;
        self
    }

    /// Returns whether `entry` satisfies the filter.
    #[must_use]
    pub fn matches(&self, entry: &TimeEntry) -> bool {
        entry.user_id() == self.user_id
            && self.task_id.is_none_or(|task_id| entry.task_id() == task_id)
            && self
                .started_from
                .is_none_or(|from| entry.start_time() >= from)
            && self.started_to.is_none_or(|to| entry.start_time() <= to)
            && (!self.completed_only || !entry.is_running())
    }
}

/// Reads and writes available inside one unit of work.
///
/// Projects, tasks and billing profiles are owned by the surrounding
/// application; the billing engine only reads them, apart from updating the
/// task fields it is responsible for (status, hours worked, billed flag).
pub trait BillingTransaction {
    /// Loads a user's billing preferences.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_profile(&mut self, user_id: UserId) -> StoreResult<Option<BillingProfile>>;

    /// Loads a project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_project(&mut self, project_id: ProjectId) -> StoreResult<Option<Project>>;

    /// Loads a task, locking it for the rest of the unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_task(&mut self, task_id: TaskId) -> StoreResult<Option<Task>>;

    /// Lists completed, unbilled tasks of a project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn billable_tasks(&mut self, project_id: ProjectId) -> StoreResult<Vec<Task>>;

    /// Persists the billing-owned fields of a task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRecord`] when the task does not exist.
    fn update_task(&mut self, task: &Task) -> StoreResult<()>;

    /// Loads the user's running entry, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn running_entry(&mut self, user_id: UserId) -> StoreResult<Option<TimeEntry>>;

    /// Loads a time entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_entry(&mut self, entry_id: TimeEntryId) -> StoreResult<Option<TimeEntry>>;

    /// Lists entries matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_entries(&mut self, filter: &TimeEntryFilter) -> StoreResult<Vec<TimeEntry>>;

    /// Counts entries matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn count_entries(&mut self, filter: &TimeEntryFilter) -> StoreResult<u64>;

    /// Lists at most `limit` entries matching `filter`, newest first, after
    /// skipping the first `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_entries_page(
        &mut self,
        filter: &TimeEntryFilter,
        offset: u64,
        limit: u32,
    ) -> StoreResult<Vec<TimeEntry>>;

    /// Stores a new time entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RunningTimerExists`] when the entry is running
    /// and the user already has a running entry.
    fn insert_entry(&mut self, entry: &TimeEntry) -> StoreResult<()>;

    /// Persists a closed time entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRecord`] when the entry does not exist.
    fn update_entry(&mut self, entry: &TimeEntry) -> StoreResult<()>;

    /// Removes a time entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRecord`] when the entry does not exist.
    fn delete_entry(&mut self, entry_id: TimeEntryId) -> StoreResult<()>;

    /// Loads an invoice, locking it for the rest of the unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_invoice(&mut self, invoice_id: InvoiceId) -> StoreResult<Option<Invoice>>;

    /// Loads the user's draft invoice for a project, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_draft_invoice(
        &mut self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> StoreResult<Option<Invoice>>;

    /// Stores a new invoice.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateInvoiceNumber`] when the user already
    /// has an invoice with the same number.
    fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()>;

    /// Persists invoice status and totals.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRecord`] when the invoice does not exist.
    fn update_invoice(&mut self, invoice: &Invoice) -> StoreResult<()>;

    /// Atomically advances and returns the user's invoice counter for `year`.
    ///
    /// The first call for a (user, year) pair returns 1.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn next_invoice_sequence(&mut self, user_id: UserId, year: i32) -> StoreResult<u32>;

    /// Loads a line item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn find_item(&mut self, item_id: InvoiceItemId) -> StoreResult<Option<InvoiceItem>>;

    /// Lists an invoice's line items in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] on storage failure.
    fn invoice_items(&mut self, invoice_id: InvoiceId) -> StoreResult<Vec<InvoiceItem>>;

    /// Stores a new line item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRecord`] when the invoice does not exist.
    fn insert_item(&mut self, item: &InvoiceItem) -> StoreResult<()>;

    /// Persists a revised line item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRecord`] when the item does not exist.
    fn update_item(&mut self, item: &InvoiceItem) -> StoreResult<()>;

    /// Removes a line item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRecord`] when the item does not exist.
    fn delete_item(&mut self, item_id: InvoiceItemId) -> StoreResult<()>;
}

/// Transactional billing persistence contract.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Runs `work` as one atomic unit.
    ///
    /// Writes made through the transaction become visible together when
    /// `work` returns `Ok`; none become visible when it returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a [`StoreError`] converted
    /// into `E` when the transaction cannot be opened or committed.
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn BillingTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;
}

/// Errors returned by billing store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The user already has a running time entry.
    #[error("user {0} already has a running timer")]
    RunningTimerExists(UserId),

    /// The invoice number is already used by this user.
    #[error("duplicate invoice number: {0}")]
    DuplicateInvoiceNumber(String),

    /// A record addressed by an update or delete does not exist.
    #[error("{entity} not found: {id}")]
    MissingRecord {
        /// Record family, such as `task`.
        entity: &'static str,
        /// Identifier of the missing record.
        id: Uuid,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Builds a missing-record error.
    #[must_use]
    pub fn missing(entity: &'static str, id: impl AsRef<Uuid>) -> Self {
        Self::MissingRecord {
            entity,
            id: *id.as_ref(),
        }
    }
}
