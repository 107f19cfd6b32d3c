//! Path resolution helpers for the runner module.
//!
//! Centralises manifest, build directory and source root logic so the main
//! runner module stays focused on command dispatch.

use crate::cli::Cli;
use anyhow::{Context, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::env;
use std::path::Path;

use super::RunnerError;

fn utf8(path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|p| RunnerError::NonUtf8Path {
        path: p.display().to_string(),
    })
}

/// Resolve `path` against the CLI's `-C` directory when it is relative.
fn in_working_dir(cli: &Cli, path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    let resolved = utf8(path)?;
    match &cli.directory {
        Some(dir) if resolved.is_relative() => Ok(utf8(dir)?.join(resolved)),
        _ => Ok(resolved),
    }
}

/// Determine the manifest path respecting the CLI's directory option.
///
/// # Errors
///
/// Returns an error when the CLI `file` or `directory` paths are not valid
/// UTF-8.
pub(super) fn resolve_manifest_path(cli: &Cli) -> Result<Utf8PathBuf> {
    Ok(in_working_dir(cli, &cli.file)?)
}

/// Determine the build directory respecting the CLI's directory option.
///
/// # Errors
///
/// Returns an error when the paths are not valid UTF-8.
pub(super) fn resolve_build_dir(cli: &Cli) -> Result<Utf8PathBuf> {
    Ok(in_working_dir(cli, &cli.build_dir)?)
}

pub(super) fn ensure_manifest_exists_or_error(cli: &Cli, manifest_path: &Utf8Path) -> Result<()> {
    if manifest_path.is_file() {
        return Ok(());
    }
    let manifest_name = manifest_path
        .file_name()
        .unwrap_or(manifest_path.as_str())
        .to_owned();
    let directory = match manifest_path.parent() {
        Some(parent) if cli.directory.is_some() || !parent.as_str().is_empty() => {
            format!("directory '{parent}'")
        }
        _ => "the current directory".to_owned(),
    };
    Err(RunnerError::ManifestNotFound {
        manifest_name,
        directory,
        path: manifest_path.to_owned(),
    }
    .into())
}

/// The manifest's directory as seen from `build_dir`.
///
/// Generated makefiles reference sources through this path, so a relocated
/// build tree keeps working as long as both trees move together. The build
/// directory need not exist yet.
///
/// # Errors
///
/// Returns an error when the current directory is unavailable or the
/// manifest directory cannot be canonicalised.
pub(super) fn source_root_from(
    manifest_path: &Utf8Path,
    build_dir: &Utf8Path,
) -> Result<Utf8PathBuf> {
    let source_dir = manifest_path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    let source = source_dir
        .canonicalize_utf8()
        .with_context(|| format!("failed to resolve '{source_dir}'"))?;
    let build = canonical_prefix(build_dir)?;
    Ok(relative_path(&build, &source))
}

/// Canonicalise the longest existing ancestor of `path` and append the rest.
fn canonical_prefix(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_owned()
    } else {
        let cwd = env::current_dir().context("failed to read the current directory")?;
        utf8(&cwd)?.join(path)
    };
    for ancestor in absolute.ancestors() {
        if let Ok(canonical) = ancestor.canonicalize_utf8() {
            let rest = absolute.strip_prefix(ancestor).unwrap_or(Utf8Path::new(""));
            return Ok(canonical.join(rest));
        }
    }
    Ok(absolute)
}

/// Path leading from directory `from` to `to`; both must be absolute.
///
/// Paths on different roots (such as Windows drives) cannot be related, so
/// `to` is returned unchanged.
pub(super) fn relative_path(from: &Utf8Path, to: &Utf8Path) -> Utf8PathBuf {
    let from_parts: Vec<Utf8Component<'_>> = from.components().collect();
    let to_parts: Vec<Utf8Component<'_>> = to.components().collect();
    if from_parts.first() != to_parts.first() {
        return to.to_owned();
    }
    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut rel = Utf8PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push("..");
    }
    for part in to_parts.iter().skip(common) {
        rel.push(part.as_str());
    }
    rel
}
