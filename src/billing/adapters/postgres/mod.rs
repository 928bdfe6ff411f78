//! `PostgreSQL` adapters for billing persistence.

mod models;
mod schema;
mod store;

pub use store::{BillingPgPool, INVOICE_NUMBER_INDEX, PostgresBillingStore, RUNNING_ENTRY_INDEX};

#[cfg(test)]
pub(crate) use models::{InvoiceRow, ProjectRow, TaskRow, TimeEntryRow, UserRow};
#[cfg(test)]
pub(crate) use store::{
    entry_to_row, invoice_to_row, row_to_entry, row_to_invoice, row_to_profile, row_to_project,
    row_to_task,
};
