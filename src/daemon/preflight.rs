//! Startup checks run before the first tick. Any failure here aborts the
//! process with a non-zero status instead of entering the loop.

#![allow(missing_docs)]

use std::ffi::OsStr;
use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::errors::{Result, WatchdogError};
use crate::probe::locate::resolve_executable;

/// Absolute paths of the external programs the watch will run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub probe_program: PathBuf,
    /// `None` in dry-run mode.
    pub shutdown_program: Option<PathBuf>,
}

/// Validate `config`, locate both executables, and require root unless the
/// shutdown is a dry run.
pub fn check(config: &Config, path_var: Option<&OsStr>, is_root: bool) -> Result<Preflight> {
    config.validate()?;
    let probe_program = resolve_executable(&config.probe.program, path_var)?;
    let shutdown_program = if config.shutdown.dry_run {
        None
    } else {
        if !is_root {
            return Err(WatchdogError::InsufficientPrivilege {
                details: "shutting the system down requires root; use --dry-run to test"
                    .to_string(),
            });
        }
        Some(resolve_executable(&config.shutdown.program, path_var)?)
    };
    Ok(Preflight {
        probe_program,
        shutdown_program,
    })
}

/// Effective-uid check for the running process.
#[cfg(unix)]
#[must_use]
pub fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
#[must_use]
pub fn running_as_root() -> bool {
    true
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt as _;
    use std::path::Path;

    fn fake_bin(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn config_with(probe: &str, shutdown: &str) -> Config {
        let mut config = Config::default();
        config.probe.program = PathBuf::from(probe);
        config.shutdown.program = PathBuf::from(shutdown);
        config
    }

    #[test]
    fn resolves_both_programs_as_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ping = fake_bin(dir.path(), "plw-test-ping");
        let shutdown = fake_bin(dir.path(), "plw-test-shutdown");
        let config = config_with("plw-test-ping", "plw-test-shutdown");
        let resolved = check(&config, Some(dir.path().as_os_str()), true).expect("preflight");
        assert_eq!(resolved.probe_program, ping);
        assert_eq!(resolved.shutdown_program, Some(shutdown));
    }

    #[test]
    fn missing_probe_aborts_startup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_with("plw-absent-ping-9c1e", "plw-absent-shutdown-9c1e");
        let err = check(&config, Some(dir.path().as_os_str()), true).unwrap_err();
        assert_eq!(err.code(), "PLW-1101");
        assert!(err.is_startup());
    }

    #[test]
    fn non_root_is_rejected_unless_dry_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        fake_bin(dir.path(), "plw-test-ping");
        let mut config = config_with("plw-test-ping", "plw-absent-shutdown-9c1e");
        let err = check(&config, Some(dir.path().as_os_str()), false).unwrap_err();
        assert_eq!(err.code(), "PLW-1102");

        config.shutdown.dry_run = true;
        let resolved = check(&config, Some(dir.path().as_os_str()), false).expect("dry run");
        assert_eq!(resolved.shutdown_program, None);
    }

    #[test]
    fn invalid_config_fails_before_lookup() {
        let mut config = Config::default();
        config.probe.packet_count = 0;
        let err = check(&config, None, true).unwrap_err();
        assert_eq!(err.code(), "PLW-1001");
    }
}
