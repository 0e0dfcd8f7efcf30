//! Docker container engine interface.
//!
//! Only the two operations the test loop needs: copying files across the
//! container boundary and reading container state.
//!
//! # Graceful Degradation
//!
//! - Unknown container: inspect() returns Ok(None)
//! - Missing State fields: Left as None, callers decide the default
//! - Malformed inspect JSON: Returns DcgossError::Parse
//! - cp failure: Returns DcgossError::CommandFailed with the exit code

use crate::platform::command::ExternalCommand;
use crate::{DcgossError, Result};
use serde::Deserialize;

/// Operations performed against the container engine
pub trait ContainerEngine {
    /// Copy files between the host and a container (`docker cp` syntax)
    fn cp(&self, source: &str, target: &str) -> Result<()>;

    /// Inspect a container; None when docker does not know it
    fn inspect(&self, container_id: &str) -> Result<Option<ContainerInspect>>;
}

/// Subset of `docker inspect` output
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    #[serde(default)]
    pub state: Option<ContainerState>,
}

/// Container state block from `docker inspect`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub running: Option<bool>,
    #[serde(default)]
    pub restarting: Option<bool>,
    #[serde(default)]
    pub started_at: Option<String>,
}

/// Parse the JSON array printed by `docker inspect`
pub fn parse_inspect(json: &str) -> Result<Option<ContainerInspect>> {
    let mut containers: Vec<ContainerInspect> =
        serde_json::from_str(json).map_err(|e| DcgossError::Parse {
            context: "docker inspect".to_string(),
            message: e.to_string(),
        })?;

    if containers.is_empty() {
        Ok(None)
    } else {
        Ok(Some(containers.swap_remove(0)))
    }
}

/// The docker CLI
#[derive(Debug, Clone)]
pub struct Docker {
    command: ExternalCommand,
}

impl Docker {
    /// Locate `docker` on PATH
    pub fn new() -> Result<Self> {
        Ok(Self::with_command(ExternalCommand::locate("docker")?))
    }

    pub fn with_command(command: ExternalCommand) -> Self {
        Docker { command }
    }
}

impl ContainerEngine for Docker {
    fn cp(&self, source: &str, target: &str) -> Result<()> {
        let code = self
            .command
            .status(&["cp".to_string(), source.to_string(), target.to_string()])?;

        if code != 0 {
            return Err(DcgossError::CommandFailed {
                command: "docker cp".to_string(),
                code,
            });
        }
        Ok(())
    }

    fn inspect(&self, container_id: &str) -> Result<Option<ContainerInspect>> {
        let output = self
            .command
            .output(&["inspect".to_string(), container_id.to_string()])?;

        if !output.success() {
            return Ok(None);
        }
        parse_inspect(&output.stdout)
    }
}
