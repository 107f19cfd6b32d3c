//! Makegen manifest Abstract Syntax Tree structures.
//!
//! This module defines the data structures used to represent a parsed
//! `Makegenfile`. They mirror the YAML schema and are deserialised through
//! [`crate::manifest`], which reports errors with source spans.
//!
//! ```rust
//! use makegen::ast::Makegenfile;
//!
//! let yaml = "makegen_version: \"1.0.0\"\nproject: demo\nlanguages: [C]\ntargets:\n  - name: app\n    kind: executable\n    sources: main.c";
//! let manifest: Makegenfile = makegen::manifest::from_str(yaml)?;
//! assert_eq!(manifest.targets.len(), 1);
//! assert_eq!(manifest.targets.first().map(|t| t.sources.to_vec()), Some(vec!["main.c".to_owned()]));
//! # Ok::<(), anyhow::Error>(())
//! ```

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::graph::{FlagSet, TargetKind};

/// Top-level manifest structure parsed from a `Makegenfile`.
///
/// ```yaml
/// makegen_version: "1.0.0"
/// project: demo
/// languages: [C]
/// directories: [lib]
/// targets:
///   - name: util
///     kind: static-library
///     directory: lib
///     sources: [util.c]
///   - name: app
///     kind: executable
///     sources: [main.c]
///     link: util
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Makegenfile {
    /// Semantic version of the manifest format.
    pub makegen_version: Version,

    /// Project name written into generated headers.
    pub project: String,

    /// Languages to enable, such as `C` or `CXX`.
    #[serde(default)]
    pub languages: StringOrList,

    /// Build configuration used when none is requested.
    #[serde(default)]
    pub build_type: Option<String>,

    /// Seed values for the definition store.
    #[serde(default)]
    pub definitions: IndexMap<String, String>,

    /// Source directories, relative to the manifest. Directories named only
    /// by targets are added after these.
    #[serde(default)]
    pub directories: Vec<Utf8PathBuf>,

    /// Build targets in declaration order.
    #[serde(default)]
    pub targets: Vec<TargetDecl>,
}

/// A single target declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDecl {
    /// Unique target name.
    pub name: String,

    /// What the target produces.
    pub kind: TargetKind,

    /// Owning directory; the project root when omitted.
    #[serde(default)]
    pub directory: Option<Utf8PathBuf>,

    /// Source files relative to the owning directory.
    #[serde(default)]
    pub sources: StringOrList,

    /// Flags applied in every configuration.
    #[serde(default)]
    pub flags: FlagSet,

    /// Flags added for a named configuration.
    #[serde(default)]
    pub config: IndexMap<String, FlagSet>,

    /// Targets whose outputs are linked.
    #[serde(default)]
    pub link: StringOrList,

    /// Targets built first without linking.
    #[serde(default)]
    pub order_only: StringOrList,

    /// Targets contributing only usage requirements.
    #[serde(default)]
    pub interface: StringOrList,

    /// Libraries passed on to dependents that link or use this target.
    #[serde(default)]
    pub interface_link: StringOrList,

    /// Commands run by a utility target.
    #[serde(default)]
    pub commands: Vec<CommandLine>,

    /// Files produced by a utility target's commands.
    #[serde(default)]
    pub outputs: StringOrList,

    /// Commands appended after the target's main step.
    #[serde(default)]
    pub post_build: Vec<CommandLine>,
}

/// A command written either as one shell-style line or as argument words.
///
/// ```yaml
/// commands:
///   - "python gen.py --out version.h"
///   - [python, gen.py, --out, version.h]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CommandLine {
    /// Split into words with POSIX shell rules.
    Line(String),
    /// Used as-is.
    Argv(Vec<String>),
}

impl CommandLine {
    /// Argument words, or `None` when a line has unbalanced quoting.
    #[must_use]
    pub fn to_argv(&self) -> Option<Vec<String>> {
        match self {
            Self::Line(line) => shlex::split(line),
            Self::Argv(words) => Some(words.clone()),
        }
    }
}

/// A helper for fields that accept either a single string or a list of
/// strings.
///
/// Empty values deserialize to `StringOrList::Empty`.
///
/// ```yaml
/// # Scalar
/// sources: main.c
/// # Sequence
/// sources:
///   - main.c
///   - util.c
/// ```
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single string item.
    String(String),
    /// A list of string items.
    List(Vec<String>),
}

impl StringOrList {
    /// Items in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Self::Empty => &[],
            Self::String(item) => std::slice::from_ref(item),
            Self::List(items) => items,
        };
        items.iter().map(String::as_str)
    }

    /// Items as owned strings.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_owned).collect()
    }
}
