//! Run integration tests.
//!
//! Tests for the full `run` lifecycle: startup polling, staging, goss
//! validation retries and timeouts.

use crate::mocks::*;
use dcgoss::Outcome;
use std::fs;
use std::time::Duration;

#[test]
fn test_run_passes_and_tears_down() {
    let project = MockProject::new();
    let outcome = project.dcgoss().run("web");

    assert_eq!(outcome, Outcome::Passed);
    assert_eq!(outcome.exit_code(), 0);

    let calls = project.calls();
    assert_eq!(calls[0], "down");
    assert_eq!(calls[1], "up:web");
    assert_eq!(project.count("render:web"), 1);
    assert_eq!(project.count("validate:web"), 1);

    // teardown order: logs, stop, down
    let tail: Vec<&str> = calls.iter().rev().take(2).map(String::as_str).collect();
    assert_eq!(tail, vec!["down", "stop:"]);
    assert_eq!(project.count("down"), 2);
}

#[test]
fn test_run_stages_goss_into_container() {
    let project = MockProject::new();
    project.dcgoss().run("web");

    let cp = project
        .calls()
        .into_iter()
        .find(|c| c.starts_with("cp:"))
        .unwrap();
    assert!(cp.ends_with(&format!("->{}:/goss", CONTAINER_ID)));

    let goss_dir = project.container.path().join("goss");
    assert!(goss_dir.join("goss").is_file());
    assert!(goss_dir.join("goss.yaml").is_file());
    assert!(!goss_dir.join("goss_wait.yaml").exists());
    assert!(!goss_dir.join("goss_vars.yaml").exists());
}

#[test]
fn test_run_goss_arguments() {
    let project = MockProject::new();
    project.dcgoss().run("web");

    let execs = project.execs();
    assert_eq!(
        execs[0],
        vec!["/goss/goss", "--gossfile=/goss/goss.yaml", "render"]
    );
    assert_eq!(
        execs[1],
        vec![
            "/goss/goss",
            "--gossfile=/goss/goss.yaml",
            "validate",
            "--format=documentation",
            "--color"
        ]
    );
}

#[test]
fn test_run_no_color() {
    let mut project = MockProject::new();
    project.settings.no_color = true;
    project.dcgoss().run("web");

    let validate = project.execs().pop().unwrap();
    assert_eq!(validate.last().map(String::as_str), Some("--no-color"));
}

#[test]
fn test_run_wait_file_first() {
    let project = MockProject::new().with_wait_file();
    let outcome = project.dcgoss().run("web");
    assert_eq!(outcome, Outcome::Passed);

    let execs = project.execs();
    assert_eq!(execs.len(), 4);
    assert_eq!(
        execs[1],
        vec![
            "/goss/goss",
            "--gossfile=/goss/goss_wait.yaml",
            "validate",
            "--retry-timeout=30s",
            "--sleep=1s",
            "--color"
        ]
    );
    assert_eq!(execs[3][1], "--gossfile=/goss/goss.yaml");
    assert!(project
        .container
        .path()
        .join("goss/goss_wait.yaml")
        .is_file());
}

#[test]
fn test_run_vars_file() {
    let project = MockProject::new().with_vars_file();
    project.dcgoss().run("web");

    for exec in project.execs() {
        assert_eq!(exec[2], "--vars=/goss/goss_vars.yaml");
    }
    assert!(project
        .container
        .path()
        .join("goss/goss_vars.yaml")
        .is_file());
}

#[test]
fn test_run_render_failure() {
    let project = MockProject::new();
    project.script(|s| {
        s.render_code = 1;
        s.render_stdout = "Error: yaml: line 2: mapping values are not allowed".to_string();
    });

    let outcome = project.dcgoss().run("web");

    match outcome {
        Outcome::Failed(message) => {
            assert!(message.starts_with("Failed to parse goss configuration:\n"));
            assert!(message.contains("mapping values are not allowed"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(project.count("validate"), 0);
    assert_eq!(project.count("stop"), 1);
}

#[test]
fn test_run_retries_until_tests_pass() {
    let project = MockProject::new();
    project.script(|s| s.validate_codes = [1, 1, 0].into());

    let outcome = project.dcgoss().run("web");

    assert_eq!(outcome, Outcome::Passed);
    assert_eq!(project.count("validate"), 3);
    assert_eq!(project.count("restart"), 0);
}

#[test]
fn test_run_restarts_stopped_service_between_attempts() {
    let project = MockProject::new();
    // startup inspects four times (up, start time twice, up again)
    project.script(|s| {
        s.states = [
            running(STARTED_AT),
            running(STARTED_AT),
            running(STARTED_AT),
            running(STARTED_AT),
            exited(),
            running(STARTED_AT),
        ]
        .into();
        s.validate_codes = [1, 0].into();
    });

    let outcome = project.dcgoss().run("web");

    assert_eq!(outcome, Outcome::Passed);
    assert_eq!(project.count("restart:web"), 1);
}

#[test]
fn test_run_times_out_when_tests_never_pass() {
    let mut project = MockProject::new();
    project.settings.retry.timeout = Duration::from_millis(100);
    project.settings.retry.interval = Duration::from_millis(5);
    project.script(|s| s.validate_codes = [1].into());

    let outcome = project.dcgoss().run("web");

    assert_eq!(
        outcome,
        Outcome::Failed("Timeout reached while waiting for all tests to pass".to_string())
    );
    assert!(project.count("validate") > 1);
    assert_eq!(project.count("stop"), 1);
}

#[test]
fn test_startup_waits_for_running_container() {
    let project = MockProject::new();
    project.script(|s| {
        s.states = [
            restarting(STARTED_AT),
            exited(),
            running(STARTED_AT),
        ]
        .into()
    });

    let outcome = project.dcgoss().run("web");

    assert_eq!(outcome, Outcome::Passed);
    assert!(project.count("inspect") >= 5);
}

#[test]
fn test_startup_rejects_container_that_restarted() {
    let project = MockProject::new();
    let later = "2020-06-01T10:00:07Z";
    // up, first start time, second start time differs, then stable
    project.script(|s| {
        s.states = [
            running(STARTED_AT),
            running(STARTED_AT),
            running(later),
            running(later),
        ]
        .into()
    });

    let outcome = project.dcgoss().run("web");

    assert_eq!(outcome, Outcome::Passed);
    // the restarted attempt forces a second stability window
    assert!(project.count("inspect") >= 7);
}

#[test]
fn test_startup_times_out_when_container_never_starts() {
    let mut project = MockProject::new();
    project.settings.retry.timeout = Duration::from_millis(50);
    project.script(|s| s.states = [exited()].into());

    let outcome = project.dcgoss().run("web");

    assert_eq!(
        outcome,
        Outcome::Failed(
            "Timeout reached while waiting for initial container startup".to_string()
        )
    );
    assert_eq!(project.count("cp:"), 0);
    assert_eq!(project.count("render"), 0);
    assert_eq!(project.count("stop"), 1);
}

#[test]
fn test_startup_times_out_without_container() {
    let mut project = MockProject::new();
    project.settings.retry.timeout = Duration::from_millis(50);
    project.script(|s| s.container_id = None);

    let outcome = project.dcgoss().run("web");

    assert!(matches!(outcome, Outcome::Failed(ref m) if m.contains("initial container startup")));
    assert_eq!(project.count("inspect"), 0);
}

#[test]
fn test_run_saves_container_logs() {
    let project = MockProject::new();
    project.script(|s| {
        s.logs.insert(
            "web".to_string(),
            vec!["web_1 | listening".to_string(), "web_1 | ready".to_string()],
        );
    });

    project.dcgoss().run("web");

    let log_dir = project.dir.path().join(".goss/logs");
    assert_eq!(
        fs::read_to_string(log_dir.join("web.log")).unwrap(),
        "web_1 | listening\nweb_1 | ready"
    );
    assert_eq!(
        fs::read_to_string(log_dir.join("db.log")).unwrap(),
        "db_1 | accepting connections"
    );
}

#[test]
fn test_run_without_logs() {
    let mut project = MockProject::new();
    project.settings.no_logs = true;

    let outcome = project.dcgoss().run("web");

    assert_eq!(outcome, Outcome::Passed);
    assert_eq!(project.count("services"), 0);
    assert!(!project.dir.path().join(".goss").exists());
}

#[test]
fn test_log_failure_does_not_fail_run() {
    let mut project = MockProject::new();
    // a file where the log directory should be
    let blocker = project.dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();
    project.settings.log_path = blocker.join("logs");

    let outcome = project.dcgoss().run("web");

    assert_eq!(outcome, Outcome::Passed);
    assert_eq!(project.count("stop"), 1);
}
