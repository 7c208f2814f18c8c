//! The watchdog loop: probe, update the debounce state, wait, repeat, until
//! the state machine asks for a shutdown or a stop signal arrives.

#![allow(missing_docs)]

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info, warn};

use super::shutdown::ShutdownAction;
use super::state::{MonitorState, Phase, Transition};
use crate::core::config::MonitorConfig;
use crate::core::errors::Result;
use crate::critical;
use crate::logger::LOG_TARGET;
use crate::probe::{Finding, ProbeOutcome, Prober};

/// Whether to keep watching after a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Continue,
    Stop,
}

/// Waits between ticks and reports stop requests.
pub trait Pacer {
    /// Wait for `interval`, or less if a stop is requested meanwhile.
    fn pause(&mut self, interval: Duration) -> Pace;

    /// Non-blocking check, made before each probe.
    fn stop_requested(&mut self) -> bool;
}

/// Pauses on a stop channel with a timeout.
#[derive(Debug)]
pub struct ChannelPacer {
    stop: Receiver<i32>,
}

impl ChannelPacer {
    #[must_use]
    pub const fn new(stop: Receiver<i32>) -> Self {
        Self { stop }
    }

    /// A pacer that can never be stopped.
    #[must_use]
    pub fn unstoppable() -> Self {
        Self::new(crossbeam_channel::never())
    }
}

impl Pacer for ChannelPacer {
    fn pause(&mut self, interval: Duration) -> Pace {
        match self.stop.recv_timeout(interval) {
            Ok(signal) => {
                info!(target: LOG_TARGET, signal, "Stop signal received");
                Pace::Stop
            }
            Err(RecvTimeoutError::Timeout) => Pace::Continue,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(interval);
                Pace::Continue
            }
        }
    }

    fn stop_requested(&mut self) -> bool {
        self.stop.try_recv().is_ok()
    }
}

/// Why [`Watchdog::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The shutdown command was issued on this run.
    ShutdownIssued { failures: u32 },
    /// A stop signal ended the watch; no shutdown.
    Stopped { failures: u32 },
    /// The shutdown had already been issued by an earlier run.
    Halted,
}

pub struct Watchdog<P, S, T> {
    prober: P,
    shutdown: S,
    pacer: T,
    state: MonitorState,
    interval: Duration,
}

impl<P: Prober, S: ShutdownAction, T: Pacer> Watchdog<P, S, T> {
    pub fn new(prober: P, shutdown: S, pacer: T, monitor: &MonitorConfig) -> Self {
        Self {
            prober,
            shutdown,
            pacer,
            state: MonitorState::new(monitor.failure_threshold),
            interval: monitor.poll_interval(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Probe once and feed the verdict to the state machine.
    ///
    /// Spawn failures count as a failed probe.
    pub fn tick(&mut self) -> Transition {
        let power_on = match self.prober.probe() {
            Ok(outcome) => {
                self.log_outcome(&outcome);
                outcome.success
            }
            Err(e) => {
                error!(
                    target: LOG_TARGET,
                    code = e.code(),
                    "PING test failed with exception: {e}, checking again after {} second",
                    self.interval.as_secs()
                );
                false
            }
        };

        let transition = self.state.observe(power_on);
        match transition {
            Transition::Incremented { failures } | Transition::TriggerShutdown { failures }
                if failures > 1 =>
            {
                warn!(target: LOG_TARGET, "PING test failed count is now {failures}");
            }
            Transition::Reset { previous } if previous > 0 => {
                info!(
                    target: LOG_TARGET,
                    "PING test recovered after {previous} consecutive failures"
                );
            }
            _ => {}
        }
        transition
    }

    /// Watch until shutdown or stop.
    ///
    /// Returns `Err` only when the shutdown command itself fails.
    pub fn run(&mut self) -> Result<LoopExit> {
        if self.state.phase() == Phase::ShuttingDown {
            return Ok(LoopExit::Halted);
        }
        loop {
            if self.pacer.stop_requested() {
                return Ok(self.stopped());
            }
            if let Transition::TriggerShutdown { failures } = self.tick() {
                critical!("Environment power off, system will shutdown immediately");
                if let Err(e) = self.shutdown.trigger() {
                    error!(target: LOG_TARGET, code = e.code(), "Shutdown command failed: {e}");
                    return Err(e);
                }
                return Ok(LoopExit::ShutdownIssued { failures });
            }
            if self.pacer.pause(self.interval) == Pace::Stop {
                return Ok(self.stopped());
            }
        }
    }

    fn stopped(&self) -> LoopExit {
        let failures = self.state.consecutive_failures();
        info!(
            target: LOG_TARGET,
            failures, "Watch stopped before any shutdown was required"
        );
        LoopExit::Stopped { failures }
    }

    fn log_outcome(&self, outcome: &ProbeOutcome) {
        let target = self.prober.target();
        debug!(target: LOG_TARGET, elapsed = ?outcome.elapsed, "Probe finished");
        match &outcome.finding {
            Finding::Summary(summary) => {
                info!(target: LOG_TARGET, "PING {target:?} completed: {summary}");
                if !outcome.success {
                    warn!(
                        target: LOG_TARGET,
                        "PING {target:?} failed with {} errors and {}% packet loss",
                        summary.error_count(),
                        summary.loss_pct
                    );
                }
            }
            Finding::Unparsable { raw, exit_code } => {
                error!(
                    target: LOG_TARGET,
                    exit_code = ?exit_code,
                    "PING {target:?} result matched failed, stdout: {raw:?}"
                );
            }
            Finding::TimedOut { raw } => {
                warn!(
                    target: LOG_TARGET,
                    "PING {target:?} killed after {:?} without finishing, stdout: {raw:?}",
                    outcome.elapsed
                );
            }
        }
        if !outcome.success {
            warn!(
                target: LOG_TARGET,
                "Environment power maybe off, checking again after {} second",
                self.interval.as_secs()
            );
        }
    }
}
