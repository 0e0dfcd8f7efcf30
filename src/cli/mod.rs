//! CLI module for argument parsing and log output.

pub mod args;
pub mod output;
