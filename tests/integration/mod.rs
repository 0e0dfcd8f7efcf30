//! Integration tests for dcgoss.
//!
//! These tests drive the orchestrator end to end against mock docker and
//! docker-compose implementations.

pub mod run_tests;
