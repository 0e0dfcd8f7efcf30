//! dcgoss CLI entry point
//!
//! Runs goss tests against docker-compose services.

use anyhow::{Context, Result};
use clap::Parser;
use dcgoss::cli::args::{Args, Target};
use dcgoss::cli::output::init_logging;
use dcgoss::config::is_truthy;
use dcgoss::version::get_build_info;
use dcgoss::{Action, Interrupt, Outcome};
use std::env;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let args = Args::parse();

    let debug = args.debug || env_flag("DEBUG");
    let no_color = args.no_color || env_flag("NO_COLOR");
    init_logging(debug, !no_color);

    match args.command.action() {
        Some((action, target)) => match execute(action, target, no_color) {
            Ok(outcome) => ExitCode::from(u8::try_from(outcome.exit_code()).unwrap_or(1)),
            Err(e) => {
                error!("{:#}", e);
                ExitCode::from(1)
            }
        },
        None => {
            println!("{}", get_build_info());
            ExitCode::SUCCESS
        }
    }
}

fn execute(action: Action, target: &Target, no_color: bool) -> Result<Outcome> {
    let interrupt = Interrupt::install()?;
    let path = target
        .project_dir()
        .context("Failed to determine the docker-compose project path")?;

    Ok(dcgoss::execute(
        action,
        &path,
        &target.service,
        interrupt,
        no_color,
    )?)
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| is_truthy(&v)).unwrap_or(false)
}
