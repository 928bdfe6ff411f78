//! In-memory adapters for billing persistence.

mod store;

pub use store::InMemoryBillingStore;
