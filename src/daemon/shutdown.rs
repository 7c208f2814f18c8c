//! The terminal action: ask the OS to power the machine off.

#![allow(missing_docs)]

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::warn;

use crate::core::config::ShutdownConfig;
use crate::core::errors::{Result, WatchdogError};
use crate::logger::LOG_TARGET;
use crate::probe::process::run_bounded;

/// Longest wait for `shutdown` to accept the request.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues the shutdown. Called at most once per process.
pub trait ShutdownAction {
    fn trigger(&mut self) -> Result<()>;
}

impl<S: ShutdownAction + ?Sized> ShutdownAction for Box<S> {
    fn trigger(&mut self) -> Result<()> {
        (**self).trigger()
    }
}

/// `shutdown -P +<delay> "<message>"`.
#[derive(Debug, Clone)]
pub struct CommandShutdown {
    program: PathBuf,
    delay_minutes: u32,
    message: String,
    timeout: Duration,
}

impl CommandShutdown {
    #[must_use]
    pub fn from_config(config: &ShutdownConfig) -> Self {
        Self {
            program: config.program.clone(),
            delay_minutes: config.delay_minutes,
            message: config.message.clone(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    fn when(&self) -> String {
        if self.delay_minutes == 0 {
            "now".to_string()
        } else {
            format!("+{}", self.delay_minutes)
        }
    }

    #[must_use]
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-P").arg(self.when()).arg(&self.message);
        command
    }
}

impl ShutdownAction for CommandShutdown {
    /// Waits for the scheduling command itself, never for the power-off.
    fn trigger(&mut self) -> Result<()> {
        let run = run_bounded(&mut self.command(), self.timeout).map_err(|e| {
            WatchdogError::ShutdownCommand {
                details: format!("could not run {}: {e}", self.program.display()),
            }
        })?;
        match run.status {
            Some(status) if status.success() => Ok(()),
            Some(status) => Err(WatchdogError::ShutdownCommand {
                details: format!(
                    "{} exited with {status}: {}",
                    self.program.display(),
                    String::from_utf8_lossy(&run.stderr).trim()
                ),
            }),
            None => Err(WatchdogError::ShutdownCommand {
                details: format!(
                    "{} did not return within {:?} and was killed",
                    self.program.display(),
                    self.timeout
                ),
            }),
        }
    }
}

/// Logs instead of shutting down.
#[derive(Debug, Clone)]
pub struct DryRunShutdown {
    rendered: String,
}

impl DryRunShutdown {
    #[must_use]
    pub fn new(command: &CommandShutdown) -> Self {
        let cmd = command.command();
        let mut rendered = cmd.get_program().to_string_lossy().into_owned();
        for arg in cmd.get_args() {
            let _ = write!(rendered, " {:?}", arg.to_string_lossy());
        }
        Self { rendered }
    }
}

impl ShutdownAction for DryRunShutdown {
    fn trigger(&mut self) -> Result<()> {
        warn!(target: LOG_TARGET, command = %self.rendered, "Dry run, not executing shutdown");
        Ok(())
    }
}
