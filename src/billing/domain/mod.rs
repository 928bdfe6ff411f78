//! Domain model for time tracking and invoice billing.
//!
//! Tasks accumulate hours from closed work sessions; completed tasks become
//! invoice lines exactly once. Everything here is free of I/O; time comes
//! from an injected [`mockable::Clock`].

mod error;
mod ids;
mod invoice;
mod invoice_item;
mod invoice_number;
mod money;
mod project;
mod stats;
mod task;
mod time_entry;

pub use error::{BillingDomainError, ParseBillingValueError};
pub use ids::{ClientId, InvoiceId, InvoiceItemId, ProjectId, TaskId, TimeEntryId, UserId};
pub use invoice::{
    Invoice, InvoiceKind, InvoiceStatus, InvoiceTotals, NewDraftInvoice, PersistedInvoiceData,
};
pub use invoice_item::{
    DEFAULT_ITEM_DESCRIPTION, InvoiceItem, InvoiceItemRevision, NewInvoiceItem,
    PersistedInvoiceItemData,
};
pub use invoice_number::{DEFAULT_INVOICE_PREFIX, InvoiceNumber};
pub use money::{
    Currency, HOURS_SCALE, MONEY_SCALE, billable_hours, ensure_non_negative, hours_from_seconds,
    line_total, round_money,
};
pub use project::{BillingProfile, BillingType, Project, ProjectStatus};
pub use stats::{
    DEFAULT_PAGE_SIZE, DailyTimeStat, MAX_PAGE_SIZE, Page, StatsPeriod, TimeEntryQuery,
    format_duration,
};
pub use task::{PersistedTaskData, Task, TaskStatus};
pub use time_entry::{MAX_DESCRIPTION_CHARS, PersistedTimeEntryData, TimeEntry};
