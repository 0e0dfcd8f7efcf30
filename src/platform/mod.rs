//! Platform abstraction layer.
//!
//! Provides consistent interfaces for:
//! - Running external commands
//! - The docker container engine
//! - The docker-compose orchestration tool

pub mod command;
pub mod compose;
pub mod docker;
