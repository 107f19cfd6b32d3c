//! Target and dependency edge definitions.

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::DirectoryId;

/// Stable handle to a [`Target`] inside a [`super::TargetGraph`].
///
/// Handles are assigned in declaration order, so comparing two handles
/// compares declaration positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TargetId(pub(crate) usize);

impl TargetId {
    /// Position of the target in declaration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// What a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// A linked program.
    Executable,
    /// An archive of object files.
    StaticLibrary,
    /// A dynamically linked library.
    SharedLibrary,
    /// A custom step with no compiled output.
    Utility,
}

impl TargetKind {
    /// Whether targets of this kind compile and link their sources.
    #[must_use]
    pub const fn is_compiled(self) -> bool {
        !matches!(self, Self::Utility)
    }

    /// Whether dependents link against the target's output.
    #[must_use]
    pub const fn is_linkable(self) -> bool {
        matches!(self, Self::StaticLibrary | Self::SharedLibrary)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Executable => "executable",
            Self::StaticLibrary => "static-library",
            Self::SharedLibrary => "shared-library",
            Self::Utility => "utility",
        })
    }
}

/// Relationship expressed by a [`DependencyEdge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// The dependent links the dependency's output.
    Link,
    /// The dependency must be built first but never triggers a rebuild.
    OrderOnly,
    /// The dependent inherits the dependency's usage requirements only.
    Interface,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Link => "link",
            Self::OrderOnly => "order-only",
            Self::Interface => "interface",
        })
    }
}

/// A directed dependency between two targets.
///
/// The dependency is stored by name so front-ends may reference targets that
/// are declared later; [`super::TargetGraph::resolve`] checks every name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    /// Target that requires the dependency.
    pub dependent: TargetId,
    /// Name of the target being depended upon.
    pub dependency: String,
    /// How the two targets relate.
    pub kind: DependencyKind,
}

/// Compile and link settings layered onto a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagSet {
    /// Flags passed to every compile step.
    #[serde(default)]
    pub compile: Vec<String>,
    /// Flags passed to the link or archive step.
    #[serde(default)]
    pub link: Vec<String>,
    /// Preprocessor definitions, without the `-D` prefix.
    #[serde(default)]
    pub defines: Vec<String>,
    /// Include search directories.
    #[serde(default)]
    pub include_dirs: Vec<Utf8PathBuf>,
}

impl FlagSet {
    /// Append `other` after the flags already present.
    pub fn extend_from(&mut self, other: &Self) {
        self.compile.extend(other.compile.iter().cloned());
        self.link.extend(other.link.iter().cloned());
        self.defines.extend(other.defines.iter().cloned());
        self.include_dirs.extend(other.include_dirs.iter().cloned());
    }

    /// Whether no flag of any category is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compile.is_empty()
            && self.link.is_empty()
            && self.defines.is_empty()
            && self.include_dirs.is_empty()
    }
}

/// A buildable unit declared by the front-end.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    name: String,
    kind: TargetKind,
    directory: DirectoryId,
    /// Source files relative to the owning directory.
    pub sources: Vec<Utf8PathBuf>,
    /// Flags applied in every configuration.
    pub flags: FlagSet,
    /// Flags layered on top of [`Target::flags`] for a named configuration.
    pub config_flags: IndexMap<String, FlagSet>,
    /// Command lines run by utility targets, one argument vector each.
    pub commands: Vec<Vec<String>>,
    /// Files produced by a utility target's commands.
    pub outputs: Vec<Utf8PathBuf>,
    /// Libraries propagated to dependents through interface edges.
    pub interface_link: Vec<String>,
}

impl Target {
    pub(crate) fn new(name: String, kind: TargetKind, directory: DirectoryId) -> Self {
        Self {
            name,
            kind,
            directory,
            sources: Vec::new(),
            flags: FlagSet::default(),
            config_flags: IndexMap::new(),
            commands: Vec::new(),
            outputs: Vec::new(),
            interface_link: Vec::new(),
        }
    }

    /// Target name; unique within a graph.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the target produces.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Directory that owns the target.
    #[must_use]
    pub const fn directory(&self) -> DirectoryId {
        self.directory
    }

    /// Base flags merged with the flags of `configuration`.
    ///
    /// Configuration names compare case-insensitively, so `debug` selects
    /// flags declared under `Debug`.
    #[must_use]
    pub fn effective_flags(&self, configuration: &str) -> FlagSet {
        let mut flags = self.flags.clone();
        for (name, extra) in &self.config_flags {
            if name.eq_ignore_ascii_case(configuration) {
                flags.extend_from(extra);
            }
        }
        flags
    }
}
