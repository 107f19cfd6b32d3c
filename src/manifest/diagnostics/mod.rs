//! Manifest errors and their diagnostics.
//!
//! [`ManifestSource`] keeps the YAML text for span rendering and
//! [`ManifestName`] labels where it came from. The mapping helpers turn
//! parser and deserialisation failures into [`miette`] diagnostics with
//! stable codes.

// The unused_assignments lint fires in some Rust versions on fields consumed
// only by the thiserror/miette derives.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use semver::Version;
use thiserror::Error;

use super::hints::{STRUCTURE_HINTS, find_hint};

mod yaml;

pub use yaml::map_yaml_error;

/// YAML source content for a manifest.
///
/// ```rust
/// use makegen::manifest::ManifestSource;
/// let source = ManifestSource::from("project: demo");
/// assert_eq!(source.as_str(), "project: demo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSource(String);

impl ManifestSource {
    /// Wrap manifest text.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    /// The manifest text.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestSource {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Label naming a manifest in diagnostics, usually its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestName(String);

impl ManifestName {
    /// Wrap a label.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The label.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ManifestName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Errors raised while loading a `Makegenfile`.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// The YAML or its structure is invalid.
    #[error("failed to parse manifest '{name}'")]
    #[diagnostic(code(makegen::manifest::parse))]
    Parse {
        /// Manifest label.
        name: ManifestName,
        /// Diagnostic describing the failure.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
    },

    /// The manifest targets an incompatible format version.
    #[error("manifest '{name}' declares makegen_version {found}")]
    #[diagnostic(
        code(makegen::manifest::version),
        help("this release reads manifests with makegen_version 1.x")
    )]
    UnsupportedVersion {
        /// Manifest label.
        name: ManifestName,
        /// Declared version.
        found: Version,
    },
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(makegen::manifest::structure))]
struct DataDiagnostic {
    #[source]
    source: serde_json::Error,
    #[help]
    help: Option<String>,
    message: String,
}

/// Map a structural deserialisation error into a diagnostic.
///
/// Structural errors are raised after YAML parsing, so they carry no span.
#[must_use]
pub fn map_data_error(
    err: serde_json::Error,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let message = format!("invalid manifest structure in {name}: {err}");
    Box::new(DataDiagnostic {
        help: find_hint(&STRUCTURE_HINTS, &message),
        source: err,
        message,
    })
}
