//! dcgoss library
//!
//! Runs goss tests against a docker-compose service.
//!
//! The library drives three external tools:
//! - `docker-compose` (or the `docker compose` plugin) to bring the project up and down
//! - `docker` to inspect containers and copy files across the container boundary
//! - `goss`, which is copied into the container and executed there
//!
//! # Example
//!
//! ```no_run
//! use dcgoss::{run, Interrupt};
//! use std::path::Path;
//!
//! let outcome = run(Path::new("."), "web", Interrupt::new(), false).expect("setup failed");
//! std::process::exit(outcome.exit_code());
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod platform;
pub mod version;

use config::GossSettings;
use engine::orchestrator::DcGoss;
use platform::compose::DockerCompose;
use platform::docker::Docker;
use std::path::Path;
use thiserror::Error;

// Re-exports for public API
pub use engine::interrupt::Interrupt;
pub use engine::result::Outcome;

/// Error types for dcgoss operations.
#[derive(Debug, Error)]
pub enum DcgossError {
    /// A required binary or file does not exist
    #[error("{0}")]
    NotFound(String),

    /// A binary exists but cannot be executed
    #[error("{0}")]
    PermissionDenied(String),

    /// An external command exited unsuccessfully
    #[error("{command} failed with exit code: {code}")]
    CommandFailed { command: String, code: i32 },

    /// I/O error
    #[error("I/O error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Output of an external command could not be parsed
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// Invalid configuration value
    #[error("Invalid value for {name}: {message}")]
    Config { name: String, message: String },

    /// Retry budget exhausted
    #[error("{0}")]
    Timeout(String),

    /// goss rejected its configuration
    #[error("{0}")]
    Validation(String),

    /// The user interrupted the run
    #[error("interrupted")]
    Interrupted,

    /// The interrupt handler could not be installed
    #[error("Failed to install interrupt handler: {0}")]
    Signal(String),
}

impl DcgossError {
    /// Wrap an I/O error with the operation it came from
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        DcgossError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, DcgossError>;

/// What to do once the service is up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Validate the service and report
    Run,
    /// Open a shell in the container to author tests
    Edit,
}

/// Build a `DcGoss` for `path` wired to the real docker tooling.
///
/// Fails when docker, docker-compose, goss or the goss file are missing.
pub fn connect(path: &Path, interrupt: Interrupt, no_color: bool) -> Result<DcGoss> {
    let mut settings = GossSettings::from_env(path)?;
    settings.no_color |= no_color;
    let docker = Docker::new()?;
    let compose = DockerCompose::new(path, settings.no_color)?;

    Ok(DcGoss::new(
        Box::new(docker),
        Box::new(compose),
        settings,
        interrupt,
    ))
}

/// Start `service`, run its goss tests and tear everything down.
pub fn run(path: &Path, service: &str, interrupt: Interrupt, no_color: bool) -> Result<Outcome> {
    Ok(connect(path, interrupt, no_color)?.run(service))
}

/// Start `service` and open an editing shell inside it.
pub fn edit(path: &Path, service: &str, interrupt: Interrupt, no_color: bool) -> Result<Outcome> {
    Ok(connect(path, interrupt, no_color)?.edit(service))
}

/// Dispatch an [`Action`].
pub fn execute(
    action: Action,
    path: &Path,
    service: &str,
    interrupt: Interrupt,
    no_color: bool,
) -> Result<Outcome> {
    match action {
        Action::Run => run(path, service, interrupt, no_color),
        Action::Edit => edit(path, service, interrupt, no_color),
    }
}
