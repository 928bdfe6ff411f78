//! `PostgreSQL` billing store.
//!
//! Each unit of work is one database transaction on a pooled connection,
//! executed on the blocking thread pool.

use super::{
    models::{
        InvoiceChangeset, InvoiceItemRow, InvoiceRow, ProjectRow, TaskChangeset, TaskRow,
        TimeEntryRow, UserRow,
    },
    schema::{invoice_items, invoice_sequences, invoices, projects, tasks, time_entries, users},
};
use crate::billing::{
    domain::{
        BillingProfile, BillingType, ClientId, Currency, Invoice, InvoiceId, InvoiceItem,
        InvoiceItemId, InvoiceKind, InvoiceNumber, InvoiceStatus, InvoiceTotals,
        PersistedInvoiceData, PersistedInvoiceItemData, PersistedTaskData, PersistedTimeEntryData,
        Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, TimeEntry, TimeEntryId,
        UserId,
    },
    ports::{BillingStore, BillingTransaction, StoreError, StoreResult, TimeEntryFilter},
};
use async_trait::async_trait;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use std::str::FromStr;

/// `PostgreSQL` connection pool type used by the billing store.
pub type BillingPgPool = Pool<ConnectionManager<PgConnection>>;

/// Partial unique index allowing one running entry per user.
pub const RUNNING_ENTRY_INDEX: &str = "idx_time_entries_one_running_per_user";

/// Unique index on invoice numbers per user.
pub const INVOICE_NUMBER_INDEX: &str = "idx_invoices_user_number";

/// `PostgreSQL`-backed billing store.
#[derive(Debug, Clone)]
pub struct PostgresBillingStore {
    pool: BillingPgPool,
}

impl PostgresBillingStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: BillingPgPool) -> Self {
        Self { pool }
    }
}

/// Why a database transaction was rolled back.
enum Rollback<E> {
    Work(E),
    Database(DieselError),
}

impl<E> From<DieselError> for Rollback<E> {
    fn from(err: DieselError) -> Self {
        Self::Database(err)
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn BillingTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, E> {
            let mut pooled = pool.get().map_err(StoreError::persistence)?;
            let connection: &mut PgConnection = &mut pooled;
            connection
                .transaction::<T, Rollback<E>, _>(|conn| {
                    let mut tx = PgBillingTransaction { connection: conn };
                    work(&mut tx).map_err(Rollback::Work)
                })
                .map_err(|rollback| match rollback {
                    Rollback::Work(err) => err,
                    Rollback::Database(err) => E::from(StoreError::persistence(err)),
                })
        })
        .await
        .map_err(StoreError::persistence)?
    }
}

struct PgBillingTransaction<'conn> {
    connection: &'conn mut PgConnection,
}

impl BillingTransaction for PgBillingTransaction<'_> {
    fn find_profile(&mut self, user_id: UserId) -> StoreResult<Option<BillingProfile>> {
        let row = users::table
            .find(user_id.into_inner())
            .select(UserRow::as_select())
            .first::<UserRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_profile).transpose()
    }

    fn find_project(&mut self, project_id: ProjectId) -> StoreResult<Option<Project>> {
        let row = projects::table
            .find(project_id.into_inner())
            .select(ProjectRow::as_select())
            .first::<ProjectRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_project).transpose()
    }

    fn find_task(&mut self, task_id: TaskId) -> StoreResult<Option<Task>> {
        let row = tasks::table
            .find(task_id.into_inner())
            .select(TaskRow::as_select())
            .for_update()
            .first::<TaskRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_task).transpose()
    }

    fn billable_tasks(&mut self, project_id: ProjectId) -> StoreResult<Vec<Task>> {
        let rows = tasks::table
            .filter(tasks::project_id.eq(project_id.into_inner()))
            .filter(tasks::status.eq(TaskStatus::Completed.as_str()))
            .filter(tasks::is_billed.eq(false))
            .order((tasks::created_at.asc(), tasks::id.asc()))
            .select(TaskRow::as_select())
            .for_update()
            .load::<TaskRow>(self.connection)
            .map_err(StoreError::persistence)?;
        rows.into_iter().map(row_to_task).collect()
    }

    fn update_task(&mut self, task: &Task) -> StoreResult<()> {
        let changes = TaskChangeset {
            status: task.status().as_str().to_owned(),
            hours_worked: task.hours_worked(),
            is_billed: task.is_billed(),
            updated_at: task.updated_at(),
        };
        let updated = diesel::update(tasks::table.find(task.id().into_inner()))
            .set(&changes)
            .execute(self.connection)
            .map_err(StoreError::persistence)?;
        ensure_affected(updated, "task", task.id())
    }

    fn running_entry(&mut self, user_id: UserId) -> StoreResult<Option<TimeEntry>> {
        let row = time_entries::table
            .filter(time_entries::user_id.eq(user_id.into_inner()))
            .filter(time_entries::is_running.eq(true))
            .select(TimeEntryRow::as_select())
            .for_update()
            .first::<TimeEntryRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        Ok(row.map(row_to_entry))
    }

    fn find_entry(&mut self, entry_id: TimeEntryId) -> StoreResult<Option<TimeEntry>> {
        let row = time_entries::table
            .find(entry_id.into_inner())
            .select(TimeEntryRow::as_select())
            .for_update()
            .first::<TimeEntryRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        Ok(row.map(row_to_entry))
    }

    fn find_entries(&mut self, filter: &TimeEntryFilter) -> StoreResult<Vec<TimeEntry>> {
        let rows = entries_matching(filter)
            .select(TimeEntryRow::as_select())
            .order((time_entries::start_time.desc(), time_entries::id.desc()))
            .load::<TimeEntryRow>(self.connection)
            .map_err(StoreError::persistence)?;
        Ok(rows.into_iter().map(row_to_entry).collect())
    }

    fn count_entries(&mut self, filter: &TimeEntryFilter) -> StoreResult<u64> {
        let matching = entries_matching(filter)
            .count()
            .get_result::<i64>(self.connection)
            .map_err(StoreError::persistence)?;
        u64::try_from(matching).map_err(StoreError::persistence)
    }

    fn find_entries_page(
        &mut self,
        filter: &TimeEntryFilter,
        offset: u64,
        limit: u32,
    ) -> StoreResult<Vec<TimeEntry>> {
        let skipped = i64::try_from(offset).map_err(StoreError::persistence)?;
        let rows = entries_matching(filter)
            .select(TimeEntryRow::as_select())
            .order((time_entries::start_time.desc(), time_entries::id.desc()))
            .limit(i64::from(limit))
            .offset(skipped)
            .load::<TimeEntryRow>(self.connection)
            .map_err(StoreError::persistence)?;
        Ok(rows.into_iter().map(row_to_entry).collect())
    }

    fn insert_entry(&mut self, entry: &TimeEntry) -> StoreResult<()> {
        let user_id = entry.user_id();
        diesel::insert_into(time_entries::table)
            .values(&entry_to_row(entry))
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                    if violates(info.as_ref(), RUNNING_ENTRY_INDEX) =>
                {
                    StoreError::RunningTimerExists(user_id)
                }
                _ => StoreError::persistence(err),
            })?;
        Ok(())
    }

    fn update_entry(&mut self, entry: &TimeEntry) -> StoreResult<()> {
        let updated = diesel::update(time_entries::table.find(entry.id().into_inner()))
            .set(&entry_to_row(entry))
            .execute(self.connection)
            .map_err(StoreError::persistence)?;
        ensure_affected(updated, "time entry", entry.id())
    }

    fn delete_entry(&mut self, entry_id: TimeEntryId) -> StoreResult<()> {
        let deleted = diesel::delete(time_entries::table.find(entry_id.into_inner()))
            .execute(self.connection)
            .map_err(StoreError::persistence)?;
        ensure_affected(deleted, "time entry", entry_id)
    }

    fn find_invoice(&mut self, invoice_id: InvoiceId) -> StoreResult<Option<Invoice>> {
        let row = invoices::table
            .find(invoice_id.into_inner())
            .select(InvoiceRow::as_select())
            .for_update()
            .first::<InvoiceRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_invoice).transpose()
    }

    fn find_draft_invoice(
        &mut self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> StoreResult<Option<Invoice>> {
        let row = invoices::table
            .filter(invoices::user_id.eq(user_id.into_inner()))
            .filter(invoices::project_id.eq(project_id.into_inner()))
            .filter(invoices::status.eq(InvoiceStatus::Draft.as_str()))
            .order((invoices::created_at.asc(), invoices::id.asc()))
            .select(InvoiceRow::as_select())
            .for_update()
            .first::<InvoiceRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        row.map(row_to_invoice).transpose()
    }

    fn insert_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        let number = invoice.number().to_string();
        diesel::insert_into(invoices::table)
            .values(&invoice_to_row(invoice))
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                    if violates(info.as_ref(), INVOICE_NUMBER_INDEX) =>
                {
                    StoreError::DuplicateInvoiceNumber(number.clone())
                }
                _ => StoreError::persistence(err),
            })?;
        Ok(())
    }

    fn update_invoice(&mut self, invoice: &Invoice) -> StoreResult<()> {
        let totals = invoice.totals();
        let changes = InvoiceChangeset {
            status: invoice.status().as_str().to_owned(),
            total_ht: totals.total_ht,
            total_tva: totals.total_tva,
            total_ttc: totals.total_ttc,
            updated_at: invoice.updated_at(),
        };
        let updated = diesel::update(invoices::table.find(invoice.id().into_inner()))
            .set(&changes)
            .execute(self.connection)
            .map_err(StoreError::persistence)?;
        ensure_affected(updated, "invoice", invoice.id())
    }

    fn next_invoice_sequence(&mut self, user_id: UserId, year: i32) -> StoreResult<u32> {
        let issued = diesel::insert_into(invoice_sequences::table)
            .values((
                invoice_sequences::user_id.eq(user_id.into_inner()),
                invoice_sequences::year.eq(year),
                invoice_sequences::last_value.eq(1),
            ))
            .on_conflict((invoice_sequences::user_id, invoice_sequences::year))
            .do_update()
            .set(invoice_sequences::last_value.eq(invoice_sequences::last_value + 1))
            .returning(invoice_sequences::last_value)
            .get_result::<i32>(self.connection)
            .map_err(StoreError::persistence)?;
        u32::try_from(issued).map_err(StoreError::persistence)
    }

    fn find_item(&mut self, item_id: InvoiceItemId) -> StoreResult<Option<InvoiceItem>> {
        let row = invoice_items::table
            .find(item_id.into_inner())
            .select(InvoiceItemRow::as_select())
            .for_update()
            .first::<InvoiceItemRow>(self.connection)
            .optional()
            .map_err(StoreError::persistence)?;
        Ok(row.map(row_to_item))
    }

    fn invoice_items(&mut self, invoice_id: InvoiceId) -> StoreResult<Vec<InvoiceItem>> {
        let rows = invoice_items::table
            .filter(invoice_items::invoice_id.eq(invoice_id.into_inner()))
            .order(invoice_items::position.asc())
            .select(InvoiceItemRow::as_select())
            .load::<InvoiceItemRow>(self.connection)
            .map_err(StoreError::persistence)?;
        Ok(rows.into_iter().map(row_to_item).collect())
    }

    fn insert_item(&mut self, item: &InvoiceItem) -> StoreResult<()> {
        diesel::insert_into(invoice_items::table)
            .values(&item_to_row(item))
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    StoreError::missing("invoice", item.invoice_id())
                }
                _ => StoreError::persistence(err),
            })?;
        Ok(())
    }

    fn update_item(&mut self, item: &InvoiceItem) -> StoreResult<()> {
        let updated = diesel::update(invoice_items::table.find(item.id().into_inner()))
            .set(&item_to_row(item))
            .execute(self.connection)
            .map_err(StoreError::persistence)?;
        ensure_affected(updated, "invoice item", item.id())
    }

    fn delete_item(&mut self, item_id: InvoiceItemId) -> StoreResult<()> {
        let deleted = diesel::delete(invoice_items::table.find(item_id.into_inner()))
            .execute(self.connection)
            .map_err(StoreError::persistence)?;
        ensure_affected(deleted, "invoice item", item_id)
    }
}

fn entries_matching(filter: &TimeEntryFilter) -> time_entries::BoxedQuery<'static, Pg> {
    let mut query = time_entries::table
        .filter(time_entries::user_id.eq(filter.user_id.into_inner()))
        .into_boxed();
    if let Some(task_id) = filter.task_id {
        query = query.filter(time_entries::task_id.eq(task_id.into_inner()));
    }
    if let Some(from) = filter.started_from {
        query = query.filter(time_entries::start_time.ge(from));
    }
    if let Some(to) = filter.started_to {
        query = query.filter(time_entries::start_time.le(to));
    }
    if filter.completed_only {
        query = query.filter(time_entries::is_running.eq(false));
    }
    query
}

fn violates(info: &dyn DatabaseErrorInformation, index: &str) -> bool {
    info.constraint_name() == Some(index)
}

fn ensure_affected(
    rows: usize,
    entity: &'static str,
    id: impl AsRef<uuid::Uuid>,
) -> StoreResult<()> {
    if rows == 0 {
        return Err(StoreError::missing(entity, id));
    }
    Ok(())
}

fn parse_column<T, P>(raw: &str) -> StoreResult<T>
where
    T: for<'a> TryFrom<&'a str, Error = P>,
    P: std::error::Error + Send + Sync + 'static,
{
    T::try_from(raw).map_err(StoreError::persistence)
}

pub(crate) fn row_to_profile(row: UserRow) -> StoreResult<BillingProfile> {
    let currency = row
        .currency
        .as_deref()
        .map(parse_column::<Currency, _>)
        .transpose()?;
    Ok(BillingProfile {
        user_id: UserId::from_uuid(row.id),
        currency,
        default_hourly_rate: row.hourly_rate,
    })
}

pub(crate) fn row_to_project(row: ProjectRow) -> StoreResult<Project> {
    Ok(Project {
        id: ProjectId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        client_id: ClientId::from_uuid(row.client_id),
        status: parse_column::<ProjectStatus, _>(&row.status)?,
        billing_type: parse_column::<BillingType, _>(&row.billing_type)?,
        name: row.name,
        hourly_rate: row.hourly_rate,
        fixed_amount: row.fixed_amount,
    })
}

pub(crate) fn row_to_task(row: TaskRow) -> StoreResult<Task> {
    let status = parse_column::<TaskStatus, _>(&row.status)?;
    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        project_id: ProjectId::from_uuid(row.project_id),
        title: row.title,
        status,
        hours_worked: row.hours_worked,
        hourly_rate: row.hourly_rate,
        is_billed: row.is_billed,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(crate) fn row_to_entry(row: TimeEntryRow) -> TimeEntry {
    TimeEntry::from_persisted(PersistedTimeEntryData {
        id: TimeEntryId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        task_id: TaskId::from_uuid(row.task_id),
        description: row.description,
        start_time: row.start_time,
        end_time: row.end_time,
        duration_seconds: row.duration,
        is_running: row.is_running,
    })
}

pub(crate) fn entry_to_row(entry: &TimeEntry) -> TimeEntryRow {
    TimeEntryRow {
        id: entry.id().into_inner(),
        user_id: entry.user_id().into_inner(),
        task_id: entry.task_id().into_inner(),
        description: entry.description().map(str::to_owned),
        start_time: entry.start_time(),
        end_time: entry.end_time(),
        duration: entry.duration_seconds(),
        is_running: entry.is_running(),
    }
}

pub(crate) fn row_to_invoice(row: InvoiceRow) -> StoreResult<Invoice> {
    let number = InvoiceNumber::from_str(&row.number).map_err(StoreError::persistence)?;
    Ok(Invoice::from_persisted(PersistedInvoiceData {
        id: InvoiceId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        client_id: ClientId::from_uuid(row.client_id),
        project_id: row.project_id.map(ProjectId::from_uuid),
        number,
        status: parse_column::<InvoiceStatus, _>(&row.status)?,
        kind: parse_column::<InvoiceKind, _>(&row.kind)?,
        currency: parse_column::<Currency, _>(&row.currency)?,
        issue_date: row.issue_date,
        due_date: row.due_date,
        notes: row.notes,
        totals: InvoiceTotals {
            total_ht: row.total_ht,
            total_tva: row.total_tva,
            total_ttc: row.total_ttc,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(crate) fn invoice_to_row(invoice: &Invoice) -> InvoiceRow {
    let totals = invoice.totals();
    InvoiceRow {
        id: invoice.id().into_inner(),
        user_id: invoice.user_id().into_inner(),
        client_id: invoice.client_id().into_inner(),
        project_id: invoice.project_id().map(ProjectId::into_inner),
        number: invoice.number().to_string(),
        status: invoice.status().as_str().to_owned(),
        kind: invoice.kind().as_str().to_owned(),
        currency: invoice.currency().as_str().to_owned(),
        issue_date: invoice.issue_date(),
        due_date: invoice.due_date(),
        notes: invoice.notes().map(str::to_owned),
        total_ht: totals.total_ht,
        total_tva: totals.total_tva,
        total_ttc: totals.total_ttc,
        created_at: invoice.created_at(),
        updated_at: invoice.updated_at(),
    }
}

pub(crate) fn row_to_item(row: InvoiceItemRow) -> InvoiceItem {
    InvoiceItem::from_persisted(PersistedInvoiceItemData {
        id: InvoiceItemId::from_uuid(row.id),
        invoice_id: InvoiceId::from_uuid(row.invoice_id),
        task_id: row.task_id.map(TaskId::from_uuid),
        description: row.description,
        quantity: row.quantity,
        unit_price: row.unit_price,
        total: row.total,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub(crate) fn item_to_row(item: &InvoiceItem) -> InvoiceItemRow {
    InvoiceItemRow {
        id: item.id().into_inner(),
        invoice_id: item.invoice_id().into_inner(),
        task_id: item.task_id().map(TaskId::into_inner),
        description: item.description().to_owned(),
        quantity: item.quantity(),
        unit_price: item.unit_price(),
        total: item.total(),
        created_at: item.created_at(),
        updated_at: item.updated_at(),
    }
}
