//! Build script for dcgoss.
//!
//! Exports git, date and compiler metadata for `dcgoss version`.

use std::env;
use std::process::Command;

fn main() {
    // Tell cargo to re-run this script if it changes
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    // Set the target triple for version info
    println!(
        "cargo:rustc-env=TARGET={}",
        env::var("TARGET").unwrap_or_else(|_| "unknown".to_string())
    );

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let hash = get_git_hash();
    let date = get_build_date();

    if let Some(ref hash) = hash {
        println!("cargo:rustc-env=DCGOSS_GIT_HASH={}", hash);
    }

    if let Some(ref date) = date {
        println!("cargo:rustc-env=DCGOSS_BUILD_DATE={}", date);
    }

    if let Some(version) = get_rustc_version() {
        println!("cargo:rustc-env=DCGOSS_RUSTC_VERSION={}", version);
    }

    println!(
        "cargo:rustc-env=DCGOSS_LONG_VERSION={}",
        long_version(&version, hash.as_deref(), date.as_deref())
    );
}

/// "0.1.4 (abc1234 2020-06-01T10:00:00Z)", parts omitted when unknown
fn long_version(version: &str, hash: Option<&str>, date: Option<&str>) -> String {
    let details: Vec<&str> = [hash, date].into_iter().flatten().collect();
    if details.is_empty() {
        version.to_string()
    } else {
        format!("{} ({})", version, details.join(" "))
    }
}

/// Run a command and return its trimmed stdout on success
fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
}

/// Get the current git commit hash (short form)
fn get_git_hash() -> Option<String> {
    command_stdout("git", &["rev-parse", "--short", "HEAD"])
}

/// Get the current build date in ISO 8601 format
fn get_build_date() -> Option<String> {
    command_stdout("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"])
}

/// Get the rustc version
fn get_rustc_version() -> Option<String> {
    // Parse "rustc 1.75.0 (..." -> "1.75.0"
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    command_stdout(&rustc, &["--version"])
        .and_then(|s| s.split_whitespace().nth(1).map(|v| v.to_string()))
}
