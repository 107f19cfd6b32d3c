//! Manifest loading helpers.
//!
//! A `Makegenfile` is parsed in two steps. The YAML is first read into a
//! [`ManifestValue`] so syntax errors carry source spans. That value is then
//! deserialised into [`Makegenfile`], whose structural errors name the
//! manifest and offer a hint. Only format version 1 is accepted.

use std::fs;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::debug;

use crate::ast::Makegenfile;

mod diagnostics;
mod hints;

/// JSON representation of a manifest after YAML parsing.
pub type ManifestValue = serde_json::Value;

pub use diagnostics::{ManifestError, ManifestName, ManifestSource, map_data_error, map_yaml_error};

/// Major format version this release reads.
pub const SUPPORTED_MAJOR: u64 = 1;

/// Parse manifest text labelled `name`.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] for invalid YAML or structure and
/// [`ManifestError::UnsupportedVersion`] for another format version.
pub fn from_str_named(yaml: &str, name: &ManifestName) -> Result<Makegenfile, ManifestError> {
    let doc: ManifestValue =
        serde_saphyr::from_str(yaml).map_err(|e| ManifestError::Parse {
            source: map_yaml_error(e, &ManifestSource::from(yaml), name),
            name: name.clone(),
        })?;
    let manifest: Makegenfile = serde_json::from_value(doc).map_err(|e| ManifestError::Parse {
        source: map_data_error(e, name),
        name: name.clone(),
    })?;
    if manifest.makegen_version.major != SUPPORTED_MAJOR {
        return Err(ManifestError::UnsupportedVersion {
            name: name.clone(),
            found: manifest.makegen_version,
        });
    }
    debug!(
        manifest = %name,
        project = %manifest.project,
        targets = manifest.targets.len(),
        "parsed manifest"
    );
    Ok(manifest)
}

/// Parse manifest text.
///
/// # Errors
///
/// Returns an error if YAML parsing or validation fails.
pub fn from_str(yaml: &str) -> Result<Makegenfile> {
    Ok(from_str_named(yaml, &ManifestName::new("Makegenfile"))?)
}

/// Load a [`Makegenfile`] from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to parse.
pub fn from_path(path: &Utf8Path) -> Result<Makegenfile> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read manifest '{path}'"))?;
    Ok(from_str_named(&data, &ManifestName::new(path.as_str()))?)
}

#[cfg(test)]
mod tests;
