//! Settings resolution.
//!
//! All tunables come from environment variables so the tool can be driven
//! from CI pipelines without extra flags. Resolution goes through a lookup
//! function, which lets tests supply a plain map instead of the process
//! environment.

use crate::platform::command::find_on_path;
use crate::{DcgossError, Result};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RETRY_TIMEOUT_SECS: f64 = 300.0;
pub const DEFAULT_RETRY_INTERVAL_SECS: f64 = 0.2;
pub const DEFAULT_INITIAL_STARTUP_SECS: f64 = 5.0;
pub const DEFAULT_GOSS_OPTS: &str = "--format=documentation";
pub const DEFAULT_GOSS_WAIT_OPTS: &str = "--retry-timeout=30s --sleep=1s";

/// Timing of the startup and validation loops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Overall budget, measured from the start of startup
    pub timeout: Duration,
    /// Wait between failed validation attempts
    pub interval: Duration,
    /// How long the container must stay up without restarting
    pub initial_startup: Duration,
    /// Wait between container state polls
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            timeout: Duration::from_secs_f64(DEFAULT_RETRY_TIMEOUT_SECS),
            interval: Duration::from_secs_f64(DEFAULT_RETRY_INTERVAL_SECS),
            initial_startup: Duration::from_secs_f64(DEFAULT_INITIAL_STARTUP_SECS),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Resolved configuration for one dcgoss invocation
#[derive(Debug, Clone)]
pub struct GossSettings {
    pub retry: RetryPolicy,
    /// goss binary copied into the container
    pub goss_bin: PathBuf,
    /// Directory holding the goss files
    pub files_path: PathBuf,
    pub goss_file: PathBuf,
    pub goss_vars: PathBuf,
    pub goss_wait: PathBuf,
    /// Where container logs are written on shutdown
    pub log_path: PathBuf,
    /// Arguments for the main `goss validate`
    pub goss_opts: Vec<String>,
    /// Arguments for the wait-file `goss validate`
    pub goss_wait_opts: Vec<String>,
    pub no_logs: bool,
    pub no_color: bool,
}

impl GossSettings {
    /// Resolve settings from the process environment
    pub fn from_env(project_dir: &Path) -> Result<Self> {
        let path = env::var_os("PATH");
        Self::resolve(project_dir, |name| env::var(name).ok(), path)
    }

    /// Resolve settings using `lookup` for variables and `path` for binaries
    pub fn resolve<F>(project_dir: &Path, lookup: F, path: Option<OsString>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let retry = RetryPolicy {
            timeout: duration_var(&lookup, "GOSS_RETRY_TIMEOUT", DEFAULT_RETRY_TIMEOUT_SECS)?,
            interval: duration_var(&lookup, "GOSS_SLEEP", DEFAULT_RETRY_INTERVAL_SECS)?,
            initial_startup: duration_var(
                &lookup,
                "GOSS_INITIAL_STARTUP",
                DEFAULT_INITIAL_STARTUP_SECS,
            )?,
            ..RetryPolicy::default()
        };

        let goss_bin = lookup("GOSS_PATH")
            .map(PathBuf::from)
            .or_else(|| find_on_path("goss", path))
            .ok_or_else(|| {
                DcgossError::NotFound(
                    "goss binary is not present on PATH or GOSS_PATH is not set".to_string(),
                )
            })?;

        let files_path = lookup("GOSS_FILES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| project_dir.to_path_buf());
        let file_var = |name: &str, default: &str| {
            lookup(name)
                .map(PathBuf::from)
                .unwrap_or_else(|| files_path.join(default))
        };

        let goss_file = file_var("GOSS_FILE", "goss.yaml");
        let goss_vars = file_var("GOSS_VARS", "goss_vars.yaml");
        let goss_wait = file_var("GOSS_WAIT", "goss_wait.yaml");
        let log_path = file_var("GOSS_LOGS", ".goss/logs");

        if !goss_file.is_file() {
            return Err(DcgossError::NotFound(format!(
                "goss.yaml not present in {}",
                files_path.display()
            )));
        }

        Ok(GossSettings {
            retry,
            goss_bin,
            goss_file,
            goss_vars,
            goss_wait,
            log_path,
            goss_opts: split_opts(&lookup("GOSS_OPTS").unwrap_or_else(|| DEFAULT_GOSS_OPTS.into())),
            goss_wait_opts: split_opts(
                &lookup("GOSS_WAIT_OPTS").unwrap_or_else(|| DEFAULT_GOSS_WAIT_OPTS.into()),
            ),
            no_logs: flag_var(&lookup, "NO_LOGS"),
            no_color: flag_var(&lookup, "NO_COLOR"),
            files_path,
        })
    }

    pub fn has_vars(&self) -> bool {
        self.goss_vars.is_file()
    }

    pub fn has_wait(&self) -> bool {
        self.goss_wait.is_file()
    }
}

/// `1` or `true`, any case
pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true")
}

fn flag_var<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> bool {
    lookup(name).map(|v| is_truthy(&v)).unwrap_or(false)
}

fn duration_var<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    name: &str,
    default_secs: f64,
) -> Result<Duration> {
    match lookup(name) {
        None => Ok(Duration::from_secs_f64(default_secs)),
        Some(raw) => parse_seconds(&raw).map_err(|message| DcgossError::Config {
            name: name.to_string(),
            message,
        }),
    }
}

/// Parse a non-negative number of seconds, fractions allowed
pub fn parse_seconds(raw: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", raw))?;

    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{}' is not a valid duration", raw))
}

fn split_opts(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
