//! docker-compose interface.
//!
//! Every invocation is scoped to a fixed project name (`goss`) and to the
//! project directory and file the tool was pointed at, so test resources
//! never collide with a developer's own compose project.
//!
//! # Graceful Degradation
//!
//! - Query commands (`ps`, `logs`, `top`): Non-zero exit yields an empty result
//! - Lifecycle commands (`up`, `down`, `stop`, ...): Non-zero exit returns
//!   DcgossError::CommandFailed
//! - Standalone `docker-compose` missing: Falls back to the `docker compose` plugin

use crate::platform::command::{CommandOutput, ExternalCommand};
use crate::{DcgossError, Result};
use std::env;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project name used for every compose invocation
pub const PROJECT_NAME: &str = "goss";

/// Compose file names probed in the project directory, in order
pub const COMPOSE_FILES: [&str; 4] = [
    "docker-compose.yaml",
    "docker-compose.yml",
    "compose.yaml",
    "compose.yml",
];

/// Operations performed against the orchestration tool
pub trait ComposeTool {
    /// Create and start `service` and its dependencies in the background
    fn up(&self, service: Option<&str>) -> Result<()>;

    /// Remove containers, networks and volumes
    fn down(&self) -> Result<()>;

    fn start(&self, service: Option<&str>) -> Result<()>;

    fn stop(&self, service: Option<&str>) -> Result<()>;

    fn restart(&self, service: Option<&str>) -> Result<()>;

    /// Run a command in the service container with inherited stdio
    fn exec(&self, service: &str, args: &[String]) -> Result<i32>;

    /// Run a command in the service container and capture its output
    fn exec_captured(&self, service: &str, args: &[String]) -> Result<CommandOutput>;

    /// Run a command in the service container attached to the terminal
    fn exec_interactive(&self, service: &str, args: &[String]) -> Result<i32>;

    /// Log lines of one service, or all services
    fn logs(&self, service: Option<&str>) -> Result<Vec<String>>;

    /// Names of all services in the project
    fn services(&self) -> Result<Vec<String>>;

    /// Container id of `service`, None when it has no container
    fn container_id(&self, service: &str) -> Result<Option<String>>;

    /// Whether `service` has running processes
    fn is_running(&self, service: &str) -> Result<bool>;
}

/// Find the compose file inside `dir`
pub fn find_compose_file(dir: &Path) -> Result<PathBuf> {
    COMPOSE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            DcgossError::NotFound(format!("docker-compose.yaml not present in {}", dir.display()))
        })
}

/// Global arguments placed before every compose subcommand
pub fn project_args(dir: &Path, file: &Path, no_color: bool, plugin: bool) -> Vec<String> {
    let mut args = vec![
        "--project-name".to_string(),
        PROJECT_NAME.to_string(),
        "--project-directory".to_string(),
        dir.display().to_string(),
        "--file".to_string(),
        file.display().to_string(),
    ];

    if no_color {
        if plugin {
            args.push("--ansi".to_string());
            args.push("never".to_string());
        } else {
            args.push("--no-ansi".to_string());
        }
    }
    args
}

/// Split `logs` output into lines, dropping the attach banner
pub fn parse_log_lines(stdout: &str) -> Vec<String> {
    let mut lines = stdout.lines().peekable();
    if lines
        .peek()
        .map(|first| first.starts_with("Attaching to"))
        .unwrap_or(false)
    {
        lines.next();
    }
    lines.map(str::to_string).collect()
}

/// Split `ps --services` output into service names
pub fn parse_services(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn with_service(subcommand: &[&str], service: Option<&str>) -> Vec<String> {
    subcommand
        .iter()
        .copied()
        .chain(service)
        .map(str::to_string)
        .collect()
}

/// docker-compose bound to one project directory
#[derive(Debug, Clone)]
pub struct DockerCompose {
    command: ExternalCommand,
}

impl DockerCompose {
    /// Resolve the compose binary on PATH and the project file in `project_dir`
    pub fn new(project_dir: &Path, no_color: bool) -> Result<Self> {
        Self::resolve(project_dir, no_color, env::var_os("PATH"))
    }

    /// Same as `new`, searching `path` for the compose binary
    pub fn resolve(project_dir: &Path, no_color: bool, path: Option<OsString>) -> Result<Self> {
        let (base, plugin) = match ExternalCommand::locate_in("docker-compose", path.clone()) {
            Ok(cmd) => (cmd, false),
            Err(DcgossError::NotFound(msg)) => match ExternalCommand::locate_in("docker", path) {
                Ok(docker) => {
                    debug!("{}; using the docker compose plugin", msg);
                    (docker.with_prefix(["compose"]), true)
                }
                Err(_) => return Err(DcgossError::NotFound(msg)),
            },
            Err(e) => return Err(e),
        };

        let file = find_compose_file(project_dir)?;
        Ok(Self::with_command(base.with_prefix(project_args(
            project_dir,
            &file,
            no_color,
            plugin,
        ))))
    }

    /// Wrap a command that already carries the project arguments
    pub fn with_command(command: ExternalCommand) -> Self {
        DockerCompose { command }
    }

    fn lifecycle(&self, name: &str, args: Vec<String>) -> Result<()> {
        let code = self.command.status(&args)?;
        if code != 0 {
            return Err(DcgossError::CommandFailed {
                command: format!("docker-compose {}", name),
                code,
            });
        }
        Ok(())
    }

    fn exec_args(service: &str, args: &[String], tty: bool) -> Vec<String> {
        let mut cmd = vec!["exec".to_string()];
        if !tty {
            cmd.push("-T".to_string());
        }
        cmd.push(service.to_string());
        cmd.extend(args.iter().cloned());
        cmd
    }
}

impl ComposeTool for DockerCompose {
    fn up(&self, service: Option<&str>) -> Result<()> {
        self.lifecycle("up", with_service(&["up", "-d"], service))
    }

    fn down(&self) -> Result<()> {
        self.lifecycle("down", with_service(&["down", "--volumes"], None))
    }

    fn start(&self, service: Option<&str>) -> Result<()> {
        self.lifecycle("start", with_service(&["start"], service))
    }

    fn stop(&self, service: Option<&str>) -> Result<()> {
        self.lifecycle("stop", with_service(&["stop"], service))
    }

    fn restart(&self, service: Option<&str>) -> Result<()> {
        self.lifecycle("restart", with_service(&["restart"], service))
    }

    fn exec(&self, service: &str, args: &[String]) -> Result<i32> {
        let tty = std::io::stdin().is_terminal();
        self.command.status(&Self::exec_args(service, args, tty))
    }

    fn exec_captured(&self, service: &str, args: &[String]) -> Result<CommandOutput> {
        self.command.output(&Self::exec_args(service, args, false))
    }

    fn exec_interactive(&self, service: &str, args: &[String]) -> Result<i32> {
        let cmd = Self::exec_args(service, args, true);
        debug!(
            "Executing interactive command: {:?}",
            self.command.prepare(&cmd)
        );
        self.command.status(&cmd)
    }

    fn logs(&self, service: Option<&str>) -> Result<Vec<String>> {
        let output = self.command.output(&with_service(&["logs"], service))?;
        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(parse_log_lines(&output.stdout))
    }

    fn services(&self) -> Result<Vec<String>> {
        let output = self.command.output(&with_service(&["ps", "--services"], None))?;
        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(parse_services(&output.stdout))
    }

    fn container_id(&self, service: &str) -> Result<Option<String>> {
        let output = self
            .command
            .output(&with_service(&["ps", "--quiet"], Some(service)))?;
        let id = output.stdout.trim();
        if !output.success() || id.is_empty() {
            return Ok(None);
        }
        Ok(Some(id.to_string()))
    }

    fn is_running(&self, service: &str) -> Result<bool> {
        let output = self.command.output(&with_service(&["top"], Some(service)))?;
        Ok(output.success() && !output.stdout.is_empty())
    }
}
