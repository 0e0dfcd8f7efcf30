//! Test run orchestrator.
//!
//! Drives one service through startup, goss validation and teardown.
//!
//! # Lifecycle
//!
//! 1. Remove leftovers from a previous run and bring the service up
//! 2. Poll until the container is running and has not restarted within the
//!    initial startup window
//! 3. Copy goss and its files into the container
//! 4. Validate (`run`) or open a shell for authoring tests (`edit`)
//! 5. Save container logs, stop and remove everything
//!
//! Steps 2 and 4 share one retry budget measured from the start of step 1.
//! Step 5 always runs. An interrupt during step 5 restarts it once; a
//! second interrupt abandons it.

use crate::config::GossSettings;
use crate::engine::interrupt::Interrupt;
use crate::engine::result::Outcome;
use crate::engine::staging::{self, CONTAINER_DIR};
use crate::platform::compose::ComposeTool;
use crate::platform::docker::{ContainerEngine, ContainerState};
use crate::{DcgossError, Result};
use chrono::{DateTime, FixedOffset};
use std::fs;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Shell started by `edit`, with goss on PATH and /goss as working directory
pub const EDIT_SHELL: &str = "cd /goss; PATH=\"/goss:$PATH\" exec sh";

/// Runs goss against one compose service
pub struct DcGoss {
    docker: Box<dyn ContainerEngine>,
    compose: Box<dyn ComposeTool>,
    settings: GossSettings,
    interrupt: Interrupt,
    start_time: Option<Instant>,
    forced_shutdown: bool,
}

impl DcGoss {
    pub fn new(
        docker: Box<dyn ContainerEngine>,
        compose: Box<dyn ComposeTool>,
        settings: GossSettings,
        interrupt: Interrupt,
    ) -> Self {
        DcGoss {
            docker,
            compose,
            settings,
            interrupt,
            start_time: None,
            forced_shutdown: false,
        }
    }

    /// Start `service`, run the wait and main goss files, tear down
    pub fn run(&mut self, service: &str) -> Outcome {
        let result = self.validate_service(service);
        self.finish(result)
    }

    /// Start `service`, open a shell in it, copy edited files back, tear down
    pub fn edit(&mut self, service: &str) -> Outcome {
        let result = self.edit_service(service);
        self.finish(result)
    }

    fn validate_service(&mut self, service: &str) -> Result<()> {
        self.startup(service)?;

        if self.settings.has_wait() {
            info!("Preparing to execute goss wait tests...");
            let args = self.settings.goss_wait_opts.clone();
            self.run_goss_validate(service, "goss_wait.yaml", args)?;
        }

        info!("Preparing to execute goss tests...");
        let args = self.settings.goss_opts.clone();
        self.run_goss_validate(service, "goss.yaml", args)?;

        info!("All tests successfully executed.");
        Ok(())
    }

    fn edit_service(&mut self, service: &str) -> Result<()> {
        self.startup(service)?;

        let container_id = self.require_container_id(service)?;
        let short_id: String = container_id.chars().take(12).collect();

        info!(
            "Starting shell within \"{}\" service container ({})...",
            service, short_id
        );
        info!("Use \"goss add\" or \"goss autoadd\" to add tests and type \"exit\" when ready to save.");
        let code = self.compose.exec_interactive(
            service,
            &["sh".to_string(), "-c".to_string(), EDIT_SHELL.to_string()],
        )?;
        debug!("Shell exited with code {}", code);

        debug!("Copying updated goss configurations from container...");
        staging::copy_out(self.docker.as_ref(), &self.settings, &container_id)
    }

    /// Turn the body's result into an outcome, always tearing down
    fn finish(&mut self, result: Result<()>) -> Outcome {
        let outcome = match result {
            Ok(()) => Outcome::Passed,
            Err(_) if self.interrupt.is_set() => Outcome::Interrupted,
            Err(e) => {
                error!("{}", e);
                Outcome::Failed(e.to_string())
            }
        };

        match self.shutdown() {
            Ok(()) => outcome,
            Err(DcgossError::Interrupted) => Outcome::ForcedShutdown,
            Err(e) => {
                error!("{}", e);
                outcome.with_teardown_failure(e.to_string())
            }
        }
    }

    /// Bring `service` up, wait for it to settle and stage goss inside it
    pub fn startup(&mut self, service: &str) -> Result<()> {
        info!("Starting up...");
        self.start_time = Some(Instant::now());

        info!("Removing any previous test resources...");
        self.compose.down()?;

        info!("Starting \"{}\" service and any dependencies...", service);
        self.compose.up(Some(service))?;

        info!(
            "Waiting for \"{}\" service container to start successfully...",
            service
        );
        let retry = self.settings.retry;
        loop {
            self.check_timeout("Timeout reached while waiting for initial container startup")?;

            if !self.is_service_up(service)? {
                self.interrupt.sleep(retry.poll_interval)?;
                continue;
            }

            let first = self.start_time_of(service)?;
            self.interrupt.sleep(retry.initial_startup)?;
            let second = self.start_time_of(service)?;

            if first == second {
                self.interrupt.sleep(retry.poll_interval)?;
                if self.is_service_up(service)? {
                    break;
                }
            } else {
                debug!("\"{}\" restarted during the initial startup window", service);
            }
        }

        info!("Copying goss binary and configuration into container...");
        let container_id = self.require_container_id(service)?;
        staging::copy_in(self.docker.as_ref(), &self.settings, &container_id)
    }

    /// Whether the service container is running and not restarting
    pub fn is_service_up(&self, service: &str) -> Result<bool> {
        let Some(state) = self.container_state(service)? else {
            return Ok(false);
        };
        Ok(state_is_up(state.as_ref()))
    }

    /// When the service container last started
    pub fn start_time_of(&self, service: &str) -> Result<Option<DateTime<FixedOffset>>> {
        let state = self.container_state(service)?.flatten();
        match state.and_then(|s| s.started_at) {
            Some(raw) => parse_started_at(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Outer None: no container. Inner None: container without a State block.
    fn container_state(&self, service: &str) -> Result<Option<Option<ContainerState>>> {
        let Some(container_id) = self.compose.container_id(service)? else {
            return Ok(None);
        };
        Ok(self
            .docker
            .inspect(&container_id)?
            .map(|container| container.state))
    }

    fn require_container_id(&self, service: &str) -> Result<String> {
        self.compose.container_id(service)?.ok_or_else(|| {
            DcgossError::NotFound(format!("No container found for \"{}\" service", service))
        })
    }

    fn check_timeout(&self, message: &str) -> Result<()> {
        let elapsed = self.start_time.map(|t| t.elapsed()).unwrap_or_default();
        if elapsed > self.settings.retry.timeout {
            return Err(DcgossError::Timeout(message.to_string()));
        }
        Ok(())
    }

    /// Validate `goss_file` inside the container until it passes or time runs out
    pub fn run_goss_validate(
        &mut self,
        service: &str,
        goss_file: &str,
        mut goss_args: Vec<String>,
    ) -> Result<()> {
        let goss = format!("{}/goss", CONTAINER_DIR);
        let mut global_args = vec![format!("--gossfile={}/{}", CONTAINER_DIR, goss_file)];
        if self.settings.has_vars() {
            global_args.push(format!("--vars={}/goss_vars.yaml", CONTAINER_DIR));
        }

        self.interrupt.sleep(self.settings.retry.interval)?;

        info!("Validating goss file...");
        let render = self
            .compose
            .exec_captured(service, &goss_command(&goss, &global_args, "render", &[]))?;
        self.interrupt.check()?;
        if !render.success() {
            return Err(DcgossError::Validation(format!(
                "Failed to parse goss configuration:\n{}",
                render.stdout
            )));
        }

        goss_args.push(if self.settings.no_color {
            "--no-color".to_string()
        } else {
            "--color".to_string()
        });
        let validate = goss_command(&goss, &global_args, "validate", &goss_args);

        loop {
            self.check_timeout("Timeout reached while waiting for all tests to pass")?;

            info!("Executing \"goss validate\"...");
            let code = self.compose.exec(service, &validate)?;
            self.interrupt.check()?;
            if code == 0 {
                return Ok(());
            }
            info!("Failed to execute all goss tests");

            info!(
                "Waiting {} second(s) before retrying...",
                self.settings.retry.interval.as_secs_f64()
            );
            self.interrupt.sleep(self.settings.retry.interval)?;

            if !self.is_service_up(service)? {
                info!("\"{}\" is not running, restarting it...", service);
                self.compose.restart(Some(service))?;
            }
        }
    }

    /// Save logs and remove every test resource
    ///
    /// Returns Err(Interrupted) only when a second interrupt abandoned it.
    pub fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down...");
        loop {
            let seen = self.interrupt.count();
            let result = self.teardown();
            if self.interrupt.count() == seen {
                return result;
            }

            if self.forced_shutdown {
                return Err(DcgossError::Interrupted);
            }
            warn!("Shutdown is in progress, force shutdown by sending another interrupt...");
            self.forced_shutdown = true;
        }
    }

    fn teardown(&self) -> Result<()> {
        if !self.settings.no_logs {
            info!("Saving container logs...");
            if let Err(e) = self.save_logs() {
                error!("Failed to save container logs: {}", e);
            }
        }

        info!("Stopping services...");
        self.compose.stop(None)?;

        info!("Removing services and networks...");
        self.compose.down()
    }

    fn save_logs(&self) -> Result<()> {
        let log_path = &self.settings.log_path;
        fs::create_dir_all(log_path)
            .map_err(|e| DcgossError::io(format!("create {}", log_path.display()), e))?;

        for service in self.compose.services()? {
            let lines = self.compose.logs(Some(&service))?;
            let file = log_path.join(format!("{}.log", service));
            debug!("Writing {} log lines to {}", lines.len(), file.display());
            fs::write(&file, lines.join("\n"))
                .map_err(|e| DcgossError::io(format!("write {}", file.display()), e))?;
        }
        Ok(())
    }
}

/// A missing flag counts as healthy; only explicit values rule a container out
pub fn state_is_up(state: Option<&ContainerState>) -> bool {
    match state {
        None => true,
        Some(state) => state.running != Some(false) && state.restarting != Some(true),
    }
}

/// Parse Docker's `StartedAt` timestamp
pub fn parse_started_at(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| DcgossError::Parse {
        context: "container StartedAt".to_string(),
        message: format!("'{}': {}", raw, e),
    })
}

fn goss_command(goss: &str, global: &[String], subcommand: &str, args: &[String]) -> Vec<String> {
    let mut cmd = Vec::with_capacity(2 + global.len() + args.len());
    cmd.push(goss.to_string());
    cmd.extend(global.iter().cloned());
    cmd.push(subcommand.to_string());
    cmd.extend(args.iter().cloned());
    cmd
}
