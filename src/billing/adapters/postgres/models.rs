//! Diesel row models for billing persistence.

use super::schema::{invoice_items, invoices, projects, tasks, time_entries, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Query result row for billing preferences.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    /// Account identifier.
    pub id: Uuid,
    /// Preferred currency code.
    pub currency: Option<String>,
    /// Fallback hourly rate.
    pub hourly_rate: Option<Decimal>,
}

/// Query result row for projects.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProjectRow {
    /// Project identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Client identifier.
    pub client_id: Uuid,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: String,
    /// Pricing model.
    pub billing_type: String,
    /// Project-level hourly rate.
    pub hourly_rate: Option<Decimal>,
    /// Fixed price.
    pub fixed_amount: Option<Decimal>,
}

/// Query result row for tasks.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Task title.
    pub title: String,
    /// Workflow status.
    pub status: String,
    /// Accumulated hours.
    pub hours_worked: Decimal,
    /// Task-level hourly rate.
    pub hourly_rate: Option<Decimal>,
    /// Billed flag.
    pub is_billed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Billing-owned task columns written back after a mutation.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
pub struct TaskChangeset {
    /// Workflow status.
    pub status: String,
    /// Accumulated hours.
    pub hours_worked: Decimal,
    /// Billed flag.
    pub is_billed: bool,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result and insert row for time entries.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = time_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TimeEntryRow {
    /// Entry identifier.
    pub id: Uuid,
    /// Tracking user.
    pub user_id: Uuid,
    /// Task worked on.
    pub task_id: Uuid,
    /// Session note.
    pub description: Option<String>,
    /// Session start.
    pub start_time: DateTime<Utc>,
    /// Session end.
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in whole seconds.
    pub duration: Option<i64>,
    /// Whether the session is open.
    pub is_running: bool,
}

/// Query result and insert row for invoices.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvoiceRow {
    /// Invoice identifier.
    pub id: Uuid,
    /// Issuing user.
    pub user_id: Uuid,
    /// Billed client.
    pub client_id: Uuid,
    /// Billed project.
    pub project_id: Option<Uuid>,
    /// Human-readable number.
    pub number: String,
    /// Payment status.
    pub status: String,
    /// Invoice kind.
    pub kind: String,
    /// Currency code.
    pub currency: String,
    /// Issue timestamp.
    pub issue_date: DateTime<Utc>,
    /// Due timestamp.
    pub due_date: DateTime<Utc>,
    /// Notes.
    pub notes: Option<String>,
    /// Pre-tax total.
    pub total_ht: Decimal,
    /// Tax total.
    pub total_tva: Decimal,
    /// Tax-inclusive total.
    pub total_ttc: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Mutable invoice columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = invoices)]
pub struct InvoiceChangeset {
    /// Payment status.
    pub status: String,
    /// Pre-tax total.
    pub total_ht: Decimal,
    /// Tax total.
    pub total_tva: Decimal,
    /// Tax-inclusive total.
    pub total_ttc: Decimal,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result and insert row for invoice items.
///
/// `position` is assigned by the database and only used for ordering.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = invoice_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvoiceItemRow {
    /// Item identifier.
    pub id: Uuid,
    /// Owning invoice.
    pub invoice_id: Uuid,
    /// Billed task.
    pub task_id: Option<Uuid>,
    /// Line label.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Line total.
    pub total: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
