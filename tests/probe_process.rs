//! `PingProber` against stand-in probe scripts: argv, timeouts, bad output.

#![cfg(unix)]

mod common;

use std::time::Duration;

use power_watchdog::core::config::ProbeConfig;
use power_watchdog::probe::{Finding, PingProber, Prober};

fn prober_for(program: std::path::PathBuf, guard_secs: u64) -> PingProber {
    let config = ProbeConfig {
        target: "192.0.2.1".to_string(),
        deadline_secs: 1,
        guard_timeout_secs: guard_secs,
        ..ProbeConfig::default()
    };
    PingProber::from_config(&config).with_program(program)
}

#[test]
fn healthy_summary_is_power_on() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ping = common::write_script(dir.path(), "ping", common::SUMMARY_ON);
    let outcome = prober_for(ping, 5).probe().expect("probe runs");
    assert!(outcome.success);
    assert_eq!(outcome.summary().map(|s| s.transmitted), Some(3));
}

#[test]
fn probe_receives_count_deadline_and_target() {
    let dir = tempfile::tempdir().expect("tempdir");
    let argv = dir.path().join("argv");
    let body = format!("echo \"$@\" > '{}'\n{}", argv.display(), common::SUMMARY_ON);
    let ping = common::write_script(dir.path(), "ping", &body);
    prober_for(ping, 5).probe().expect("probe runs");
    let recorded = std::fs::read_to_string(&argv).expect("argv recorded");
    assert_eq!(recorded.trim(), "-c 3 -w 1 192.0.2.1");
}

#[test]
fn hung_probe_is_killed_and_counts_as_power_off() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ping = common::write_script(dir.path(), "ping", "echo 'PING 192.0.2.1'\nexec sleep 30");
    let outcome = prober_for(ping, 1).probe().expect("probe runs");
    assert!(!outcome.success);
    assert!(
        matches!(&outcome.finding, Finding::TimedOut { raw } if raw.contains("PING 192.0.2.1")),
        "unexpected {:?}",
        outcome.finding
    );
    assert!(outcome.elapsed >= Duration::from_secs(1));
    assert!(outcome.elapsed < Duration::from_secs(8), "took {:?}", outcome.elapsed);
}

#[test]
fn lingering_helper_does_not_stall_a_finished_ping() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = format!("{}\nsleep 6 &\nexit 0", common::SUMMARY_ON);
    let ping = common::write_script(dir.path(), "ping", &body);
    let outcome = prober_for(ping, 1).probe().expect("probe runs");
    assert!(outcome.success, "unexpected {:?}", outcome.finding);
    assert!(outcome.elapsed < Duration::from_secs(3), "took {:?}", outcome.elapsed);
}

#[test]
fn unparsable_output_is_power_off() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ping = common::write_script(dir.path(), "ping", "echo 'something unexpected'");
    let outcome = prober_for(ping, 5).probe().expect("probe runs");
    assert!(!outcome.success);
    assert_eq!(
        outcome.finding,
        Finding::Unparsable {
            raw: "something unexpected".to_string(),
            exit_code: Some(0),
        }
    );
}

#[test]
fn stderr_only_failure_keeps_diagnostics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ping = common::write_script(
        dir.path(),
        "ping",
        "echo 'ping: connect: Network is unreachable' >&2\nexit 2",
    );
    let outcome = prober_for(ping, 5).probe().expect("probe runs");
    assert!(!outcome.success);
    assert!(
        matches!(
            &outcome.finding,
            Finding::Unparsable { raw, exit_code: Some(2) } if raw.contains("Network is unreachable")
        ),
        "unexpected {:?}",
        outcome.finding
    );
}

#[test]
fn missing_program_is_a_distinct_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = prober_for(dir.path().join("no-such-ping"), 5)
        .probe()
        .unwrap_err();
    assert_eq!(err.code(), "PLW-2001");
}
