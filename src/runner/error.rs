//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly.

// The unused_assignments lint fires in some Rust versions on fields consumed
// only by the thiserror/miette derives.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The manifest file does not exist at the expected path.
    #[error("no manifest '{manifest_name}' found in {directory}")]
    #[diagnostic(
        code(makegen::runner::manifest_not_found),
        help("create a Makegenfile or pass its path with -f")
    )]
    ManifestNotFound {
        /// Name of the expected manifest file.
        manifest_name: String,
        /// Human-readable directory description.
        directory: String,
        /// The path that was attempted.
        path: Utf8PathBuf,
    },

    /// A path given on the command line is not valid UTF-8.
    #[error("path '{path}' is not valid UTF-8")]
    #[diagnostic(code(makegen::runner::non_utf8_path))]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },

    /// The build tool could not be run or reported failure.
    #[error("build tool '{program}' failed")]
    #[diagnostic(code(makegen::runner::build_failed))]
    BuildFailed {
        /// Program that was run.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
