//! Error types for the target graph.
//!
//! Kept in a dedicated file so derive-macro lint suppressions stay narrow.

// The unused_assignments lint fires in some Rust versions on fields consumed
// only by the thiserror/miette derives.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building or ordering a [`super::TargetGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GraphError {
    /// Dependency edges form a cycle.
    #[error("cyclic dependency detected: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(makegen::graph::cycle),
        help("break the cycle by removing one of the listed dependencies")
    )]
    CyclicDependency {
        /// Target names along the cycle; the first name is repeated last.
        cycle: Vec<String>,
    },

    /// An edge names a target that was never declared.
    #[error("target '{dependent}' depends on unknown target '{dependency}'")]
    #[diagnostic(code(makegen::graph::unresolved))]
    UnresolvedDependency {
        /// Target holding the dangling edge.
        dependent: String,
        /// Name that did not resolve.
        dependency: String,
    },

    /// Two targets share a name.
    #[error("target '{name}' is declared more than once")]
    #[diagnostic(code(makegen::graph::duplicate))]
    DuplicateTarget {
        /// The repeated name.
        name: String,
    },

    /// A target name clashes with a rule every directory makefile defines.
    #[error("target name '{name}' is reserved for generated makefile rules")]
    #[diagnostic(
        code(makegen::graph::reserved_name),
        help("rename the target; `all`, `clean` and names starting with `subdir.` are reserved")
    )]
    ReservedTargetName {
        /// The rejected name.
        name: String,
    },

    /// A target was placed in a directory the tree does not contain.
    #[error("directory #{index} is not part of the project tree")]
    #[diagnostic(code(makegen::graph::unknown_directory))]
    UnknownDirectory {
        /// Index of the missing directory.
        index: usize,
    },

    /// A handle does not belong to this graph.
    #[error("target #{index} is not part of the graph")]
    #[diagnostic(code(makegen::graph::unknown_target))]
    UnknownTarget {
        /// Index of the missing target.
        index: usize,
    },
}
