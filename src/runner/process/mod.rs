//! Process helpers for running the native make tool.
//!
//! Internal to `runner`: resolves the program, logs the redacted command
//! line, and streams the child's output back to the user.

use crate::backend::BuildCommand;
use camino::{Utf8Path, Utf8PathBuf};
use make_env::MAKE_PROGRAM_ENV;
use std::{
    env,
    ffi::OsString,
    io::{self, BufReader},
    path::PathBuf,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
};
use tracing::info;

mod redaction;
mod streaming;

use redaction::{CommandArg, redact_sensitive_args};
use streaming::{ForwardStats, forward_child_output};

fn resolve_make_program_with<F>(mut read_env: F) -> Option<Utf8PathBuf>
where
    F: FnMut(&str) -> Option<OsString>,
{
    read_env(MAKE_PROGRAM_ENV)
        .filter(|value| !value.is_empty())
        .and_then(|value| Utf8PathBuf::from_path_buf(PathBuf::from(value)).ok())
}

/// Program named by `MAKEGEN_MAKE`, when set to a UTF-8 path.
#[must_use]
pub fn resolve_make_program() -> Option<Utf8PathBuf> {
    resolve_make_program_with(|key| env::var_os(key))
}

fn log_command_execution(cmd: &Command) {
    let program_path = PathBuf::from(cmd.get_program());
    let program_display = Utf8PathBuf::from_path_buf(program_path.clone()).map_or_else(
        |_| program_path.to_string_lossy().into_owned(),
        Utf8PathBuf::into_string,
    );
    let args: Vec<CommandArg> = cmd
        .get_args()
        .map(|a| CommandArg::new(a.to_string_lossy().into_owned()))
        .collect();
    let redacted_args = redact_sensitive_args(&args);
    let arg_strings: Vec<&str> = redacted_args.iter().map(CommandArg::as_str).collect();
    info!(
        "Running command: {} {}",
        program_display,
        arg_strings.join(" ")
    );
}

/// Run `build` inside `build_dir`, streaming its standard output and error
/// back to the user.
///
/// # Errors
///
/// Returns an [`io::Error`] if the process fails to spawn, the standard
/// streams are unavailable, or the tool reports a non-zero exit status.
pub fn run_build(build: &BuildCommand, build_dir: &Utf8Path) -> io::Result<()> {
    let mut cmd = Command::new(&build.program);
    cmd.args(&build.args)
        .current_dir(build_dir.as_std_path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    log_command_execution(&cmd);
    let child = cmd.spawn()?;
    let status = spawn_and_stream_output(child)?;
    check_exit_status(&build.program, status)
}

fn handle_forwarding_thread_result(result: thread::Result<ForwardStats>, stream_name: &str) {
    match result {
        Ok(stats) => {
            if stats.write_failed {
                tracing::debug!(
                    "{stream_name} forwarding encountered closed pipe; output truncated"
                );
            }
        }
        Err(err) => {
            tracing::warn!("{stream_name} forwarding thread panicked: {err:?}");
        }
    }
}

fn spawn_and_stream_output(mut child: Child) -> io::Result<ExitStatus> {
    let Some(stdout) = child.stdout.take() else {
        terminate_child(&mut child, "stdout pipe unavailable");
        return Err(io::Error::other("child process missing stdout pipe"));
    };
    let Some(stderr) = child.stderr.take() else {
        terminate_child(&mut child, "stderr pipe unavailable");
        return Err(io::Error::other("child process missing stderr pipe"));
    };

    let out_handle = thread::spawn(move || {
        let mut lock = io::stdout().lock();
        forward_child_output(BufReader::new(stdout), &mut lock, "stdout")
    });
    let err_handle = thread::spawn(move || {
        let mut lock = io::stderr().lock();
        forward_child_output(BufReader::new(stderr), &mut lock, "stderr")
    });

    let status = child.wait()?;
    handle_forwarding_thread_result(out_handle.join(), "stdout");
    handle_forwarding_thread_result(err_handle.join(), "stderr");
    Ok(status)
}

fn terminate_child(child: &mut Child, context: &str) {
    if let Err(err) = child.kill() {
        tracing::debug!("failed to kill child after {context}: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::debug!("failed to reap child after {context}: {err}");
    }
}

fn check_exit_status(program: &str, status: ExitStatus) -> io::Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{program} exited with {status}")))
    }
}
