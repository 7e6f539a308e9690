/*
 * End-to-end tests against the built `supervone` binary. Follows the
 * teacher's integration.rs style (assert_cmd + predicates), extended with a
 * couple of signal-driven tests that need a raw pid rather than assert_cmd's
 * one-shot `.assert()` since this binary is a long-running daemon, not a
 * one-shot CLI tool.
 */

use assert_cmd::Command;
use predicates::prelude::*;
use std::process::{Command as StdCommand, Stdio};
use std::time::{Duration, Instant};

fn supervone_bin() -> std::path::PathBuf {
    assert_cmd::cargo::cargo_bin("supervone")
}

fn send_signal(pid: u32, signal: i32) {
    // SAFETY: pid names a live child process owned by this test; signal is
    // one of the standard POSIX constants.
    unsafe {
        libc::kill(pid as libc::pid_t, signal);
    }
}

/* =========================================================================
 * Argument validation
 * ========================================================================= */

#[test]
fn missing_command_is_a_fatal_usage_error() {
    Command::new(supervone_bin())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty().not());
}

#[test]
fn unknown_flag_is_a_fatal_usage_error() {
    Command::new(supervone_bin())
        .arg("--bogus")
        .arg("true")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn flag_missing_its_value_is_a_fatal_usage_error() {
    Command::new(supervone_bin())
        .arg("-c")
        .assert()
        .failure()
        .code(1);
}

/* =========================================================================
 * Child lifecycle
 * ========================================================================= */

#[test]
fn exec_failure_stops_supervising_and_exits_zero() {
    // spec §8 scenario 4: a command that can't exec reaps as status 127,
    // which the supervisor treats as "stop", not "restart".
    let start = Instant::now();
    let status = StdCommand::new(supervone_bin())
        .arg("/no/such/binary-xyz")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("failed to run supervone");

    assert_eq!(status.code(), Some(0));
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "must not wait out a restart backoff before giving up"
    );
}

#[test]
fn signal_forward_does_not_restart_or_exit() {
    // spec §8 scenario 5: forwarding hangup to a live child must not be
    // mistaken for a shutdown request.
    let mut child = StdCommand::new(supervone_bin())
        .arg("-t")
        .arg("60s")
        .arg("sleep")
        .arg("5")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to run supervone");

    std::thread::sleep(Duration::from_millis(200));
    send_signal(child.id(), libc::SIGHUP);
    std::thread::sleep(Duration::from_millis(200));

    assert!(
        child.try_wait().expect("try_wait failed").is_none(),
        "supervisor must still be running after a forwarded hangup"
    );

    send_signal(child.id(), libc::SIGTERM);
    let status = child.wait().expect("failed to wait on supervone");
    assert_eq!(status.code(), Some(0));
}

#[test]
fn graceful_shutdown_forwards_terminate_and_exits_zero() {
    // spec §8 scenario 6.
    let mut child = StdCommand::new(supervone_bin())
        .arg("sleep")
        .arg("30")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to run supervone");

    std::thread::sleep(Duration::from_millis(200));
    let start = Instant::now();
    send_signal(child.id(), libc::SIGTERM);

    let status = child.wait().expect("failed to wait on supervone");
    assert_eq!(status.code(), Some(0));
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "shutdown must not wait for a restart"
    );
}

#[test]
fn daemonize_flag_detaches_successfully() {
    // -d just needs to fork, detach, and keep supervising; the parent
    // process should exit quickly, independent of the child's lifetime.
    let start = Instant::now();
    let status = StdCommand::new(supervone_bin())
        .arg("-d")
        .arg("-t")
        .arg("50")
        .arg("true")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("failed to run supervone");

    assert!(status.success());
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "daemonizing parent must return promptly"
    );
}
