//! Guarded child-process execution with a hard wall-clock bound.
//!
//! [`ChildGuard`] owns the spawned process and kills and reaps it on
//! [`Drop`], so a probe can never outlive the call that started it, whether
//! the call returns normally, times out, or unwinds. The kill covers the
//! whole process group, so a helper left running after the main process
//! exits dies with it.

#![allow(missing_docs)]

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

/// How often `try_wait` is polled while the child runs.
const POLL_STEP: Duration = Duration::from_millis(25);

/// Extra time the output readers get after the group was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Captured result of a bounded run.
#[derive(Debug)]
pub struct BoundedRun {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the child was killed at the guard.
    pub status: Option<ExitStatus>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// Owns a child process and its process group.
pub struct ChildGuard {
    child: Child,
    reaped: bool,
    terminated: bool,
}

impl ChildGuard {
    /// Spawn `command` with piped stdout/stderr and a null stdin, in its own
    /// process group on unix.
    pub fn spawn(command: &mut Command) -> io::Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            command.process_group(0);
        }
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        Ok(Self {
            child,
            reaped: false,
            terminated: false,
        })
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Wait until the child exits or `deadline` passes.
    fn wait_until(&mut self, deadline: Instant) -> io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.reaped = true;
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_STEP.min(deadline - now));
        }
    }

    /// Kill the process group, then kill and reap the child. Safe to call
    /// more than once.
    ///
    /// The group is signalled even when the child was already reaped: its
    /// pid stays reserved as the group id while any member is alive.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        #[cfg(unix)]
        kill_group(self.id());
        if !self.reaped {
            // Fails only if the child already exited; wait() reaps it either way.
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.reaped = true;
        }
    }
}

/// SIGKILL the whole group so helpers forked by the probe die with it.
#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Ok(raw) = i32::try_from(pid) {
        let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Run `command` to completion, killing it once `guard` has elapsed.
///
/// Output is drained on helper threads so a chatty child cannot block on a
/// full pipe. The readers are abandoned once the guard (plus a short grace
/// after the kill) has passed, even if something outside the process group
/// still holds a pipe open. Only a failure to spawn is returned as `Err`.
pub fn run_bounded(command: &mut Command, guard: Duration) -> io::Result<BoundedRun> {
    let started = Instant::now();
    let deadline = started + guard;
    let mut child = ChildGuard::spawn(command)?;
    let stdout = child.child.stdout.take().map(drain);
    let stderr = child.child.stderr.take().map(drain);

    let status = child.wait_until(deadline).ok().flatten();
    let timed_out = status.is_none();
    // Closes the pipes held by the child or its helpers so the readers finish.
    child.terminate();

    let drained_by = deadline.max(Instant::now()) + DRAIN_GRACE;
    Ok(BoundedRun {
        stdout: collect(stdout, drained_by),
        stderr: collect(stderr, drained_by),
        status,
        timed_out,
        elapsed: started.elapsed(),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        // The receiver is gone once the reader was abandoned.
        let _ = tx.send(buf);
    });
    rx
}

fn collect(reader: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Vec<u8> {
    reader
        .and_then(|rx| rx.recv_deadline(deadline).ok())
        .unwrap_or_default()
}
