//! Port contracts for billing persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by billing services.

pub mod store;

pub use store::{BillingStore, BillingTransaction, StoreError, StoreResult, TimeEntryFilter};
