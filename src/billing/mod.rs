//! Time tracking and automated billing.
//!
//! Work sessions are tracked per task with at most one running timer per
//! user. Closing a session adds its hours to the task; moving a task to
//! completed bills those hours onto the project's draft invoice exactly once.
//! Every operation that writes more than one record runs as a single unit of
//! work against a [`ports::BillingStore`]. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
