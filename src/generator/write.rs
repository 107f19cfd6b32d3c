//! Writing a generated tree into the build directory.

use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{GenerateError, GeneratedTree};

/// Directory holding generator bookkeeping inside the build tree.
pub const STAMP_DIR: &str = "MakegenFiles";
/// File recording the fingerprint of the last written tree.
pub const STAMP_FILE: &str = "generate.stamp";

/// What a write pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Files whose content changed, relative to the build root.
    pub written: Vec<Utf8PathBuf>,
    /// Files already holding the generated content.
    pub unchanged: usize,
    /// Whether the stamp matched and nothing was touched.
    pub up_to_date: bool,
}

/// Path of the stamp file under `build_dir`.
#[must_use]
pub fn stamp_path(build_dir: &Utf8Path) -> Utf8PathBuf {
    build_dir.join(STAMP_DIR).join(STAMP_FILE)
}

pub(super) fn write_tree(
    tree: &GeneratedTree,
    build_dir: &Utf8Path,
) -> Result<WriteReport, GenerateError> {
    let fingerprint = tree.fingerprint();
    let stamp = stamp_path(build_dir);
    if stamp_matches(&stamp, &fingerprint)
        && tree.files().all(|(p, text)| holds(&build_dir.join(p), text))
        && tree.directories().iter().all(|d| build_dir.join(d).is_dir())
    {
        debug!(stamp = %stamp, "build tree is up to date");
        return Ok(WriteReport {
            unchanged: tree.len(),
            up_to_date: true,
            ..WriteReport::default()
        });
    }

    let mut report = WriteReport::default();
    for dir in tree.directories() {
        let full = build_dir.join(dir);
        fs::create_dir_all(&full).map_err(GenerateError::io(&full))?;
    }
    for (path, text) in tree.files() {
        let full = build_dir.join(path);
        if holds(&full, text) {
            report.unchanged += 1;
            continue;
        }
        write_atomic(&full, text)?;
        info!(path = %full, "wrote file");
        report.written.push(path.to_owned());
    }
    write_atomic(&stamp, &format!("{fingerprint}\n"))?;
    Ok(report)
}

fn holds(path: &Utf8Path, text: &str) -> bool {
    fs::read_to_string(path).is_ok_and(|existing| existing == text)
}

fn stamp_matches(stamp: &Utf8Path, fingerprint: &str) -> bool {
    fs::read_to_string(stamp).is_ok_and(|recorded| recorded.trim() == fingerprint)
}

/// Replace `path` with `text` through a temporary file in the same
/// directory.
fn write_atomic(path: &Utf8Path, text: &str) -> Result<(), GenerateError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent).map_err(GenerateError::io(parent))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(GenerateError::io(parent))?;
    {
        let handle = tmp.as_file_mut();
        handle
            .write_all(text.as_bytes())
            .map_err(GenerateError::io(path))?;
        handle.flush().map_err(GenerateError::io(path))?;
        handle.sync_all().map_err(GenerateError::io(path))?;
    }
    tmp.persist(path)
        .map_err(|err| GenerateError::io(path)(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    fn tree() -> GeneratedTree {
        let mut tree = GeneratedTree::default();
        tree.insert("Makefile", &["all : sub".to_owned()]);
        tree.insert("sub/Makefile", &["all :".to_owned()]);
        tree.require_directory("sub/lib.dir".into());
        tree
    }

    #[rstest]
    fn first_write_creates_every_file_and_the_stamp() {
        let dir = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8");
        let report = write_tree(&tree(), root).expect("write");
        assert_eq!(report.written.len(), 2);
        assert!(root.join("sub/lib.dir").is_dir());
        let stamp = fs::read_to_string(stamp_path(root)).expect("stamp");
        assert_eq!(stamp.trim(), tree().fingerprint());
    }

    #[rstest]
    fn matching_stamp_skips_every_write() {
        let dir = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8");
        write_tree(&tree(), root).expect("first");
        let report = write_tree(&tree(), root).expect("second");
        assert!(report.up_to_date);
        assert!(report.written.is_empty());
    }

    #[rstest]
    fn only_changed_files_are_rewritten() {
        let dir = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8");
        write_tree(&tree(), root).expect("first");
        let mut changed = tree();
        changed.insert("sub/Makefile", &["all : lib".to_owned()]);
        let report = write_tree(&changed, root).expect("second");
        assert_eq!(report.written, vec![Utf8PathBuf::from("sub/Makefile")]);
        assert_eq!(report.unchanged, 1);
    }

    #[rstest]
    fn deleted_files_defeat_the_stamp() {
        let dir = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8");
        write_tree(&tree(), root).expect("first");
        fs::remove_file(root.join("Makefile")).expect("remove");
        let report = write_tree(&tree(), root).expect("second");
        assert_eq!(report.written, vec![Utf8PathBuf::from("Makefile")]);
    }

    #[rstest]
    fn edited_files_defeat_the_stamp() {
        let dir = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8");
        write_tree(&tree(), root).expect("first");
        fs::write(root.join("sub/Makefile"), "all : hand-edited\n").expect("edit");
        let report = write_tree(&tree(), root).expect("second");
        assert!(!report.up_to_date);
        assert_eq!(report.written, vec![Utf8PathBuf::from("sub/Makefile")]);
        assert_eq!(
            fs::read_to_string(root.join("sub/Makefile")).expect("restored"),
            tree().get("sub/Makefile").expect("generated").to_owned()
        );
    }
}
