//! File staging across the container boundary.
//!
//! goss and its yaml files are assembled in a temporary directory with
//! permissive modes, so any user inside the container can run and edit them,
//! then copied into `/goss`. Edited files come back the same way and get
//! their original host modes restored before they overwrite the originals.
//!
//! The temporary directory is removed on every path, including errors.

use crate::config::GossSettings;
use crate::platform::docker::ContainerEngine;
use crate::{DcgossError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Directory inside the container holding goss and its files
pub const CONTAINER_DIR: &str = "/goss";

/// Mode for the staging directory and the goss binary
pub const EXEC_MODE: u32 = 0o777;

/// Mode for staged yaml files
pub const FILE_MODE: u32 = 0o666;

/// Host yaml files to stage, paired with their name inside the container
pub fn staged_files(settings: &GossSettings) -> Vec<(PathBuf, &'static str)> {
    let mut files = vec![(settings.goss_file.clone(), "goss.yaml")];
    if settings.has_vars() {
        files.push((settings.goss_vars.clone(), "goss_vars.yaml"));
    }
    if settings.has_wait() {
        files.push((settings.goss_wait.clone(), "goss_wait.yaml"));
    }
    files
}

/// Copy goss and its files into `container_id:/goss`
pub fn copy_in(
    engine: &dyn ContainerEngine,
    settings: &GossSettings,
    container_id: &str,
) -> Result<()> {
    let temp = temp_dir()?;
    let result = stage_in(engine, settings, container_id, temp.path());
    cleanup(temp);
    result
}

fn stage_in(
    engine: &dyn ContainerEngine,
    settings: &GossSettings,
    container_id: &str,
    dir: &Path,
) -> Result<()> {
    debug!("Copying goss binary to temp directory: {}", settings.goss_bin.display());
    copy_file(&settings.goss_bin, &dir.join("goss"))?;

    let files = staged_files(settings);
    for (host, name) in &files {
        debug!("Copying {} to temp directory: {}", name, host.display());
        copy_file(host, &dir.join(name))?;
    }

    debug!("Setting permissions on temp directory: {:o}", EXEC_MODE);
    set_mode(dir, EXEC_MODE)?;
    debug!("Setting permissions on goss binary: {:o}", EXEC_MODE);
    set_mode(&dir.join("goss"), EXEC_MODE)?;
    for (_, name) in &files {
        debug!("Setting permissions on {}: {:o}", name, FILE_MODE);
        set_mode(&dir.join(name), FILE_MODE)?;
    }

    engine.cp(
        &format!("{}/.", dir.display()),
        &format!("{}:{}", container_id, CONTAINER_DIR),
    )
}

/// Copy edited goss files out of `container_id:/goss` over the host originals
pub fn copy_out(
    engine: &dyn ContainerEngine,
    settings: &GossSettings,
    container_id: &str,
) -> Result<()> {
    let temp = temp_dir()?;
    let result = stage_out(engine, settings, container_id, temp.path());
    cleanup(temp);
    result
}

fn stage_out(
    engine: &dyn ContainerEngine,
    settings: &GossSettings,
    container_id: &str,
    dir: &Path,
) -> Result<()> {
    debug!(
        "Copying {} from container ({}) into temp directory: {}",
        CONTAINER_DIR,
        container_id,
        dir.display()
    );
    engine.cp(
        &format!("{}:{}", container_id, CONTAINER_DIR),
        &dir.display().to_string(),
    )?;

    let staged = dir.join("goss");
    let files = staged_files(settings);

    for (host, name) in &files {
        let mode = file_mode(host)?;
        debug!("Restoring permissions on {}: {:o}", name, mode);
        set_mode(&staged.join(name), mode)?;
    }

    for (host, name) in &files {
        debug!("Copying {} back to its original location: {}", name, host.display());
        copy_file(&staged.join(name), host)?;
    }
    Ok(())
}

fn temp_dir() -> Result<TempDir> {
    let temp = tempfile::Builder::new()
        .prefix("dcgoss")
        .tempdir()
        .map_err(|e| DcgossError::io("create temp directory", e))?;
    debug!("Created temp directory: {}", temp.path().display());
    Ok(temp)
}

fn cleanup(temp: TempDir) {
    debug!("Removing temp directory: {}", temp.path().display());
    if let Err(e) = temp.close() {
        debug!("Failed to remove temp directory: {}", e);
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| DcgossError::io(format!("copy {}", from.display()), e))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| DcgossError::io(format!("chmod {}", path.display()), e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o7777)
        .map_err(|e| DcgossError::io(format!("stat {}", path.display()), e))
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Result<u32> {
    Ok(FILE_MODE)
}
