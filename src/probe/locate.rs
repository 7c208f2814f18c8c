//! Executable lookup for the probe and shutdown programs.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, WatchdogError};

/// Searched after `PATH`; `shutdown` lives here and non-root `PATH`s often
/// omit it.
const SBIN_FALLBACKS: [&str; 4] = ["/usr/local/sbin", "/usr/sbin", "/sbin", "/usr/bin"];

/// Resolve `program` to an executable file.
///
/// Names containing a path separator are checked as given; bare names are
/// searched in `path_var` and then the sbin fallbacks.
pub fn resolve_executable(program: &Path, path_var: Option<&OsStr>) -> Result<PathBuf> {
    let missing = || WatchdogError::MissingExecutable {
        program: program.to_path_buf(),
    };

    if program.components().count() > 1 || program.is_absolute() {
        return if is_executable(program) {
            Ok(program.to_path_buf())
        } else {
            Err(missing())
        };
    }

    let searched = path_var
        .map(|raw| std::env::split_paths(raw).collect::<Vec<_>>())
        .unwrap_or_default();
    searched
        .into_iter()
        .chain(SBIN_FALLBACKS.iter().map(PathBuf::from))
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(missing)
}

/// Resolve against the process `PATH`.
pub fn resolve_from_env(program: &Path) -> Result<PathBuf> {
    let path_var = std::env::var_os("PATH");
    resolve_executable(program, path_var.as_deref())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
