//! Shared helpers for integration tests: run the `plw` binary with a
//! scrubbed environment and keep a per-case log for failure triage.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

pub struct CliResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn log_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("plw-test-logs");
    fs::create_dir_all(&dir).expect("create log dir");
    dir
}

/// Run `plw` with `args` and record the invocation and its output.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CliResult {
    let mut command = Command::new(env!("CARGO_BIN_EXE_plw"));
    command.args(args).env_remove("RUST_LOG");
    for key in [
        "PLW_TARGET",
        "PLW_POLL_INTERVAL_SECS",
        "PLW_FAILURE_THRESHOLD",
        "PLW_DRY_RUN",
        "PLW_LOG_LEVEL",
    ] {
        command.env_remove(key);
    }
    let output = command.output().expect("run plw binary");

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let log_path = log_dir().join(format!("{case_name}.log"));
    let log = format!(
        "args: {args:?}\nstatus: {}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n",
        output.status
    );
    fs::write(&log_path, log).expect("write case log");

    CliResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Write an executable shell script standing in for `ping` or `shutdown`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::io::Write as _;
    use std::os::unix::fs::PermissionsExt as _;

    let path = dir.join(name);
    {
        let mut file = fs::File::create(&path).expect("create script");
        writeln!(file, "#!/bin/sh\n{body}").expect("write script");
        file.sync_all().expect("sync script");
    }
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// Write a config file that points the watchdog at `probe`.
pub fn write_config(dir: &Path, probe: &Path, extra: &str) -> PathBuf {
    let path = dir.join("plw.toml");
    let body = format!(
        "[probe]\nprogram = {:?}\ndeadline_secs = 1\nguard_timeout_secs = 2\n{extra}\n",
        probe.display().to_string()
    );
    fs::write(&path, body).expect("write config");
    path
}

pub const SUMMARY_ON: &str =
    "echo '3 packets transmitted, 3 received, 0% packet loss, time 12ms'";
pub const SUMMARY_OFF: &str =
    "echo '3 packets transmitted, 0 received, +2 errors, 100% packet loss, time 3012ms'";
