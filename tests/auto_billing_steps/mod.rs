//! Step definitions for auto-billing behaviour scenarios.

mod given;
mod then;
mod when;
pub mod world;
