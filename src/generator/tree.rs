//! The in-memory result of a generation run.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Generated files keyed by path relative to the build root, in directory
/// order, plus the build-tree directories recipes expect to exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedTree {
    files: IndexMap<Utf8PathBuf, String>,
    directories: Vec<Utf8PathBuf>,
}

impl GeneratedTree {
    /// Add a file rendered as `lines`, replacing any previous content.
    ///
    /// Trailing blank lines are dropped and the text ends with one newline.
    pub fn insert(&mut self, path: impl Into<Utf8PathBuf>, lines: &[String]) {
        let end = lines
            .iter()
            .rposition(|line| !line.is_empty())
            .map_or(0, |last| last + 1);
        let mut text = lines.get(..end).unwrap_or_default().join("\n");
        text.push('\n');
        self.files.insert(path.into(), text);
    }

    /// Record a directory that must exist in the build tree.
    pub fn require_directory(&mut self, dir: Utf8PathBuf) {
        if !self.directories.contains(&dir) {
            self.directories.push(dir);
        }
    }

    /// Text of the file at `path`.
    #[must_use]
    pub fn get(&self, path: impl AsRef<Utf8Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Files in generation order.
    pub fn files(&self) -> impl Iterator<Item = (&Utf8Path, &str)> {
        self.files.iter().map(|(p, t)| (p.as_path(), t.as_str()))
    }

    /// Directories the recipes write into.
    #[must_use]
    pub fn directories(&self) -> &[Utf8PathBuf] {
        &self.directories
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file was generated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// SHA-256 digest of every path and its content, as lowercase hex.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, text) in &self.files {
            hasher.update(b"file");
            update_with_len(&mut hasher, path.as_str().as_bytes());
            update_with_len(&mut hasher, text.as_bytes());
        }
        for dir in &self.directories {
            hasher.update(b"dir");
            update_with_len(&mut hasher, dir.as_str().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

fn update_with_len(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update(bytes.len().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(bytes);
}
