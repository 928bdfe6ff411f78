//! Adapter implementations of the billing store port.

pub mod memory;
pub mod postgres;
