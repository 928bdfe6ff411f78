//! Timebill: time tracking and automated billing for freelancers.
//!
//! The crate turns tracked work sessions into invoices. It keeps a single
//! running timer per user, accumulates task hours, keeps invoice totals
//! consistent with their line items, bills completed tasks exactly once and
//! issues sequential invoice numbers.
//!
//! # Architecture
//!
//! Timebill follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`billing`]: Timers, time aggregation, invoice totals, auto-billing and
//!   invoice numbering
//! - [`config`]: Environment-driven engine settings

pub mod billing;
pub mod config;
