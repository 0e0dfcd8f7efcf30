//! External command runner.
//!
//! Wraps a resolved binary plus a fixed argument prefix. Every invocation is
//! logged at debug level before it runs.
//!
//! # Graceful Degradation
//!
//! - Binary missing from PATH: Returns DcgossError::NotFound
//! - Binary not executable: Returns DcgossError::PermissionDenied
//! - Spawn failure: Returns DcgossError::Io with the command as context
//! - Killed by a signal: Reported as exit code 128 + signal (or 1 off unix)
//! - Non-UTF8 output: Converted lossily

use crate::{DcgossError, Result};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Captured result of a command run with piped output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A binary on disk plus arguments always passed before the caller's
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    binary: PathBuf,
    prefix: Vec<String>,
}

impl ExternalCommand {
    /// Resolve `name` on the process PATH
    pub fn locate(name: &str) -> Result<Self> {
        Self::locate_in(name, env::var_os("PATH"))
    }

    /// Resolve `name` on a PATH-style list
    pub fn locate_in(name: &str, path: Option<OsString>) -> Result<Self> {
        let binary = find_on_path(name, path)
            .ok_or_else(|| DcgossError::NotFound(format!("{} binary is not present on PATH", name)))?;
        Self::at(&binary)
    }

    /// Use an explicit binary path
    pub fn at(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DcgossError::NotFound(format!(
                "{} is not present",
                path.display()
            )));
        }
        if !is_executable(path) {
            return Err(DcgossError::PermissionDenied(format!(
                "{} binary is not executable",
                binary_name(path)
            )));
        }

        Ok(ExternalCommand {
            binary: path.to_path_buf(),
            prefix: Vec::new(),
        })
    }

    /// Add arguments placed before every invocation's own arguments
    pub fn with_prefix<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full argv for `args`, binary first
    pub fn prepare(&self, args: &[String]) -> Vec<String> {
        let mut cmd = Vec::with_capacity(1 + self.prefix.len() + args.len());
        cmd.push(self.binary.display().to_string());
        cmd.extend(self.prefix.iter().cloned());
        cmd.extend(args.iter().cloned());
        cmd
    }

    fn command(&self, args: &[String]) -> Command {
        debug!("Executing command: {:?}", self.prepare(args));
        let mut command = Command::new(&self.binary);
        command.args(&self.prefix).args(args);
        command
    }

    /// Run with inherited stdio and return the exit code
    pub fn status(&self, args: &[String]) -> Result<i32> {
        let status = self
            .command(args)
            .status()
            .map_err(|e| DcgossError::io(self.describe(args), e))?;
        Ok(exit_code(status))
    }

    /// Run with captured stdout and stderr
    pub fn output(&self, args: &[String]) -> Result<CommandOutput> {
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DcgossError::io(self.describe(args), e))?;

        Ok(CommandOutput {
            code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn describe(&self, args: &[String]) -> String {
        let sub = args.first().map(String::as_str).unwrap_or_default();
        format!("{} {}", binary_name(&self.binary), sub).trim_end().to_string()
    }
}

/// Search a PATH-style list for an executable file called `name`
pub fn find_on_path(name: &str, path: Option<OsString>) -> Option<PathBuf> {
    let path = path?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn binary_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| 128 + s))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
