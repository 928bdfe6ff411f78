//! Unit tests for the billing domain, services and adapters.

mod support;
