//! Reachability probing: run an external ping-style utility against the
//! reference host and classify its summary into a power verdict.

pub mod locate;
pub mod outcome;
pub mod process;
pub mod summary;

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

pub use outcome::{Finding, ProbeOutcome};
pub use summary::{PingSummary, PowerPolicy};

use crate::core::config::ProbeConfig;
use crate::core::errors::{Result, WatchdogError};

/// One reachability check per call.
///
/// Timeouts, bad output and non-zero exits are folded into a power-off
/// [`ProbeOutcome`]. `Err` is reserved for failing to start the check.
pub trait Prober {
    /// Run a single check to completion or to the guard timeout.
    fn probe(&mut self) -> Result<ProbeOutcome>;

    /// Host being probed, for log lines.
    fn target(&self) -> &str;
}

/// Runs `<program> -c <count> -w <deadline> <target>`.
#[derive(Debug, Clone)]
pub struct PingProber {
    program: PathBuf,
    target: String,
    packet_count: u32,
    deadline: Duration,
    guard: Duration,
    policy: PowerPolicy,
}

impl PingProber {
    /// Build from the `[probe]` section. The program is looked up on `PATH`
    /// at spawn time unless [`Self::with_program`] supplies a path.
    #[must_use]
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            program: config.program.clone(),
            target: config.target.clone(),
            packet_count: config.packet_count,
            deadline: Duration::from_secs(config.deadline_secs),
            guard: config.guard_timeout(),
            policy: PowerPolicy {
                max_errors: config.max_errors,
                max_loss_pct: config.max_loss_pct,
            },
        }
    }

    /// Use an already-resolved executable path.
    #[must_use]
    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-c")
            .arg(self.packet_count.to_string())
            .arg("-w")
            .arg(self.deadline.as_secs().to_string())
            .arg(&self.target)
            // The summary parser expects untranslated output.
            .env("LC_ALL", "C");
        command
    }
}

impl Prober for PingProber {
    fn probe(&mut self) -> Result<ProbeOutcome> {
        let run = process::run_bounded(&mut self.command(), self.guard).map_err(|source| {
            WatchdogError::ProbeSpawn {
                program: self.program.clone(),
                source,
            }
        })?;

        let outcome = if run.timed_out {
            ProbeOutcome::timed_out(&run.stdout)
        } else if run.stdout.is_empty() {
            // Nothing on stdout; keep stderr so the log says why.
            ProbeOutcome::parse(&run.stderr, &self.policy)
        } else {
            ProbeOutcome::parse(&run.stdout, &self.policy)
        };
        Ok(outcome
            .with_exit_code(run.status.and_then(|status| status.code()))
            .with_elapsed(run.elapsed))
    }

    fn target(&self) -> &str {
        &self.target
    }
}
