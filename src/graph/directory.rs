//! Source directory tree.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

/// Handle to a directory inside a [`DirectoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DirectoryId(pub(crate) usize);

impl DirectoryId {
    /// The project root; always the first directory of a tree.
    pub const ROOT: Self = Self(0);

    /// Position of the directory in declaration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One node of the directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    /// Path relative to the source root; the root itself is empty.
    pub path: Utf8PathBuf,
    /// Enclosing directory, `None` for the root.
    pub parent: Option<DirectoryId>,
}

/// Directories of a project in declaration order.
///
/// The root is created with the tree. Adding a nested path also adds its
/// missing ancestors so every directory has a parent chain to the root.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryTree {
    dirs: Vec<Directory>,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self {
            dirs: vec![Directory {
                path: Utf8PathBuf::new(),
                parent: None,
            }],
        }
    }
}

impl DirectoryTree {
    /// Register `path`, returning the existing handle when already present.
    ///
    /// `.` and the empty path name the root. Leading `./` components and
    /// trailing separators are ignored.
    pub fn add(&mut self, path: &Utf8Path) -> DirectoryId {
        let normalised = normalise(path);
        if let Some(id) = self.find(&normalised) {
            return id;
        }
        let parent = normalised
            .parent()
            .map_or(DirectoryId::ROOT, |parent| self.add(parent));
        self.dirs.push(Directory {
            path: normalised,
            parent: Some(parent),
        });
        DirectoryId(self.dirs.len() - 1)
    }

    /// Look up a directory by path.
    #[must_use]
    pub fn find(&self, path: &Utf8Path) -> Option<DirectoryId> {
        let normalised = normalise(path);
        self.dirs
            .iter()
            .position(|dir| dir.path == normalised)
            .map(DirectoryId)
    }

    /// Borrow a directory by handle.
    #[must_use]
    pub fn get(&self, id: DirectoryId) -> Option<&Directory> {
        self.dirs.get(id.0)
    }

    /// Whether `id` belongs to this tree.
    #[must_use]
    pub fn contains(&self, id: DirectoryId) -> bool {
        id.0 < self.dirs.len()
    }

    /// Iterate over directories in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (DirectoryId, &Directory)> {
        self.dirs
            .iter()
            .enumerate()
            .map(|(idx, dir)| (DirectoryId(idx), dir))
    }

    /// Direct children of `id` in declaration order.
    pub fn children(&self, id: DirectoryId) -> impl Iterator<Item = DirectoryId> + '_ {
        self.iter()
            .filter(move |(_, dir)| dir.parent == Some(id))
            .map(|(child, _)| child)
    }

    /// Number of directories, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Always `false`: a tree holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

fn normalise(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|c| !matches!(c, camino::Utf8Component::CurDir))
        .collect()
}
