//! Test utilities for process management.
//!
//! This crate provides a fake make executable that records how it was
//! invoked, plus guards for tests that mutate the process environment.

pub mod env_lock;
pub mod env_var_guard;

pub use env_lock::EnvLock;
pub use env_var_guard::EnvVarGuard;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A fake make program living in a temporary directory.
#[derive(Debug)]
pub struct FakeMake {
    dir: TempDir,
    program: PathBuf,
    log: PathBuf,
}

impl FakeMake {
    /// Path of the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Directory holding the executable and its log.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Working directory and arguments of the last invocation.
    ///
    /// Returns `None` when the program has not run.
    pub fn invocation(&self) -> Option<(PathBuf, Vec<String>)> {
        let text = fs::read_to_string(&self.log).ok()?;
        let mut lines = text.lines();
        let cwd = PathBuf::from(lines.next()?);
        Some((cwd, lines.map(str::to_owned).collect()))
    }
}

/// Create a fake make executable that records its working directory and
/// arguments, one per line, then exits with `exit_code`.
pub fn fake_make(exit_code: i32) -> FakeMake {
    let dir = TempDir::new().expect("temp dir");
    let program = dir.path().join("make");
    let log = dir.path().join("invocation.log");
    let mut file = File::create(&program).expect("script");
    writeln!(
        file,
        "#!/bin/sh\npwd -P > '{log}'\nfor arg in \"$@\"; do printf '%s\\n' \"$arg\" >> '{log}'; done\nexit {exit_code}",
        log = log.display()
    )
    .expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&program).expect("meta").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&program, perms).expect("perms");
    }
    FakeMake { dir, program, log }
}
