//! Errors raised while generating makefiles.

// The unused_assignments lint fires in some Rust versions on fields consumed
// only by the thiserror/miette derives.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::io;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use super::GeneratorState;
use crate::graph::GraphError;
use crate::policy::PolicyError;

/// Errors that abort a generation run.
#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    /// The target graph is malformed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    /// A rule references a target missing from the graph.
    #[error("'{dependent}' references unknown target '{dependency}'")]
    #[diagnostic(
        code(makegen::generate::unresolved),
        help("declare the target or remove the reference")
    )]
    UnresolvedDependency {
        /// Target or directory holding the reference.
        dependent: String,
        /// Name that did not resolve.
        dependency: String,
    },

    /// A rule asks for the output file of a target that produces none.
    #[error("'{dependent}' needs the output file of '{target}', which produces none")]
    #[diagnostic(code(makegen::generate::no_target_file))]
    NoTargetFile {
        /// Target holding the reference.
        dependent: String,
        /// Target without an output file.
        target: String,
    },

    /// A command argument cannot be written into a recipe line.
    #[error("'{dependent}' has an argument that cannot be quoted: {argument:?}")]
    #[diagnostic(
        code(makegen::generate::invalid_argument),
        help("recipe arguments must not contain line breaks")
    )]
    InvalidArgument {
        /// Target holding the command.
        dependent: String,
        /// The offending argument.
        argument: String,
    },

    /// The backend cannot drive a requested language.
    #[error("generator '{generator}' does not support language '{language}'")]
    #[diagnostic(
        code(makegen::generate::unsupported_language),
        help("supported languages: {supported}")
    )]
    UnsupportedLanguage {
        /// Backend display name.
        generator: &'static str,
        /// Requested language as written.
        language: String,
        /// Languages the backend supports.
        supported: String,
    },

    /// A backend policy lacks a knob a code path needs.
    #[error(transparent)]
    #[diagnostic(transparent)]
    PolicyMisconfiguration(#[from] PolicyError),

    /// An operation was called out of order.
    #[error("cannot {operation} while the generator is {state}")]
    #[diagnostic(code(makegen::generate::invalid_state))]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the generator was in.
        state: GeneratorState,
    },

    /// Generation was cancelled between directories.
    #[error("generation cancelled")]
    #[diagnostic(code(makegen::generate::cancelled))]
    Cancelled,

    /// Writing the build tree failed.
    #[error("failed to write '{path}'")]
    #[diagnostic(code(makegen::generate::io))]
    Io {
        /// File or directory being written.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl GenerateError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
