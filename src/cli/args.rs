//! Command line arguments for dcgoss.
//!
//! Only the action, the target service and a couple of output switches live
//! on the command line. Everything else is configured through `GOSS_*`
//! environment variables (see `config`).

use crate::Action;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

/// Parsed command line arguments
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(
    name = "dcgoss",
    about = "A docker-compose wrapper for goss",
    version,
    long_version = crate::version::LONG_VERSION
)]
pub struct Args {
    /// Action to execute
    #[command(subcommand)]
    pub command: Command,

    /// Log every external command (same as DEBUG=1)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output (same as NO_COLOR=1)
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Command to execute
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Start the service and run its goss tests
    Run(Target),
    /// Start the service and open a shell to add goss tests
    Edit(Target),
    /// Print version information
    Version,
}

/// Service to test and where its compose project lives
#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct Target {
    /// docker-compose service name
    pub service: String,

    /// docker-compose project path (default: current directory)
    pub path: Option<PathBuf>,
}

impl Target {
    /// Project directory, falling back to the working directory
    pub fn project_dir(&self) -> std::io::Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => env::current_dir(),
        }
    }
}

impl Command {
    /// The test action and its target, None for informational commands
    pub fn action(&self) -> Option<(Action, &Target)> {
        match self {
            Command::Run(target) => Some((Action::Run, target)),
            Command::Edit(target) => Some((Action::Edit, target)),
            Command::Version => None,
        }
    }
}
