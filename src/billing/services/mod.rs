//! Application services for time tracking and billing.
//!
//! Each multi-row operation runs as one [`crate::billing::ports::BillingStore`]
//! unit of work.

mod aggregator;
mod auto_billing;
mod engine;
mod error;
mod invoice_totals;
mod numbering;
mod ownership;
mod timer;

pub use aggregator::TimeAggregator;
pub use auto_billing::{AutoBilledTask, AutoBillingService, ProjectInvoice, TaskStatusUpdate};
pub use engine::BillingEngine;
pub use error::{BillingError, BillingResult, ErrorKind};
pub use invoice_totals::{CreateItemRequest, InvoiceService, UpdateItemRequest};
pub use numbering::InvoiceNumberingService;
pub use timer::{ActiveTimer, StartTimerRequest, TimerService};
