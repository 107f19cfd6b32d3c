//! Path composition for rendered makefiles.
//!
//! Every [`Location`] is resolved relative to the directory recipes run in:
//! the makefile's own directory when the shell can change directory, the
//! build root otherwise.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use super::command::Location;
use crate::policy::PathConvention;

/// Resolves locations relative to a fixed base inside the build tree.
#[derive(Debug, Clone)]
pub(crate) struct PathComposer<'a> {
    /// Base directory relative to the build root.
    base: Utf8PathBuf,
    /// Source root as spelled from the build root.
    source_root: &'a Utf8Path,
    mangle: bool,
    convention: PathConvention,
}

impl<'a> PathComposer<'a> {
    pub(crate) fn new(
        base: &Utf8Path,
        source_root: &'a Utf8Path,
        mangle: bool,
        convention: PathConvention,
    ) -> Self {
        Self {
            base: normalise(base),
            source_root,
            mangle,
            convention,
        }
    }

    /// Path of `location` relative to the base, using `/` separators.
    pub(crate) fn compose(&self, location: &Location) -> Utf8PathBuf {
        match location {
            Location::Source(path) => self.from_build_root(&self.source_root.join(path)),
            Location::Build(path) => self.from_build_root(path),
            Location::Object {
                dir,
                source,
                suffix,
            } => self.from_build_root(&dir.join(object_name(source, suffix, self.mangle))),
        }
    }

    /// [`Self::compose`] rendered with the policy's separator.
    pub(crate) fn render(&self, location: &Location) -> String {
        self.convert(&self.compose(location))
    }

    /// Render an already composed relative path with the policy's separator.
    pub(crate) fn convert(&self, path: &Utf8Path) -> String {
        let text = if path.as_str().is_empty() {
            ".".to_owned()
        } else {
            path.as_str().to_owned()
        };
        match self.convention {
            PathConvention::Unix => text,
            PathConvention::Windows => text.replace('/', "\\"),
        }
    }

    /// Relative path from the base to `path`, which is relative to the build
    /// root. Absolute paths are returned unchanged.
    pub(crate) fn from_build_root(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            return path.to_owned();
        }
        relative_to(&self.base, path)
    }
}

/// File name of the object compiled from `source`.
///
/// Mangled names flatten the source path into one component so sources that
/// share a file name in different subdirectories never collide. Unmangled
/// names mirror the source layout.
pub(crate) fn object_name(source: &Utf8Path, suffix: &str, mangle: bool) -> Utf8PathBuf {
    if mangle {
        let flat: String = normalise(source)
            .components()
            .map(|c| match c {
                Utf8Component::ParentDir => "__".to_owned(),
                other => other.as_str().replace(['.', ':', ' '], "_"),
            })
            .collect::<Vec<_>>()
            .join("_");
        Utf8PathBuf::from(format!("{flat}{suffix}"))
    } else {
        let stem = source.with_extension("");
        Utf8PathBuf::from(format!("{}{suffix}", stem.as_str().replace("../", "__/")))
    }
}

/// Lexical relative path from directory `base` to `path`, both relative to
/// the same root.
pub(crate) fn relative_to(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    let base_parts: Vec<_> = normalise(base)
        .components()
        .map(|c| c.as_str().to_owned())
        .collect();
    let path_norm = normalise(path);
    let path_parts: Vec<_> = path_norm
        .components()
        .map(|c| c.as_str().to_owned())
        .collect();
    let common = base_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b && a.as_str() != "..")
        .count();
    let mut out = Utf8PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in path_parts.iter().skip(common) {
        out.push(part);
    }
    out
}

/// Remove `.` components and fold `name/..` pairs.
pub(crate) fn normalise(path: &Utf8Path) -> Utf8PathBuf {
    let mut parts: Vec<Utf8Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match parts.last() {
                Some(Utf8Component::Normal(_)) => {
                    parts.pop();
                }
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.into_iter().collect()
}

/// Turn a target or path name into a make variable identifier.
///
/// The mapping is injective: `_` doubles and every other byte outside
/// `[A-Za-z0-9]` becomes `_` plus two lowercase hex digits, so `a-b` and
/// `a_b` never share variables. Suffixes such as `_FLAGS` start with an
/// uppercase letter after the `_` and cannot be mistaken for an escape.
pub(crate) fn make_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'_' => out.push_str("__"),
            b if b.is_ascii_alphanumeric() => out.push(char::from(b)),
            b => out.push_str(&format!("_{b:02x}")),
        }
    }
    out
}
