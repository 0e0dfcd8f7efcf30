//! Test run engine.
//!
//! Provides the startup/validate/teardown orchestrator, file staging,
//! interrupt tracking and run outcomes.

pub mod interrupt;
pub mod orchestrator;
pub mod result;
pub mod staging;
