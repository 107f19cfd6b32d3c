//! Canonical output locations of every target.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::{Language, ToolchainConfig};
use crate::graph::{DirectoryId, Target, TargetGraph, TargetKind};
use crate::policy::GeneratorPolicy;

/// What a target contributes to the build once lowered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEntry {
    /// The target produces this file, relative to the build root.
    File(Utf8PathBuf),
    /// The target has rules but no file output.
    Symbolic,
    /// The target lowers to nothing; dependents skip it.
    Empty,
}

/// Output locations registered directory by directory.
#[derive(Debug, Clone, Default)]
pub struct OutputRegistry {
    entries: IndexMap<String, OutputEntry>,
}

impl OutputRegistry {
    /// Register the outputs of every target owned by `directory`.
    pub fn register_directory(
        &mut self,
        graph: &TargetGraph,
        directory: DirectoryId,
        toolchain: &ToolchainConfig,
        policy: &GeneratorPolicy,
    ) {
        let Some(dir) = graph.directories().get(directory) else {
            return;
        };
        for (_, target) in graph.targets_in(directory) {
            let entry = canonical_output(target, &dir.path, toolchain, policy);
            debug!(target = target.name(), ?entry, "registered output");
            self.entries.insert(target.name().to_owned(), entry);
        }
    }

    /// Entry for `name`, if registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutputEntry> {
        self.entries.get(name)
    }

    /// Output file of `name`, if it has one.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&Utf8Path> {
        match self.entries.get(name) {
            Some(OutputEntry::File(path)) => Some(path),
            _ => None,
        }
    }

    /// Whether `name` produces rules dependents can wait on.
    #[must_use]
    pub fn is_buildable(&self, name: &str) -> bool {
        matches!(
            self.entries.get(name),
            Some(OutputEntry::File(_) | OutputEntry::Symbolic)
        )
    }
}

/// Build directory holding a target's objects and flags file.
pub(crate) fn target_dir(directory: &Utf8Path, name: &str) -> Utf8PathBuf {
    directory.join(format!("{name}.dir"))
}

/// Sources of `target` that compile under an enabled language, in order.
///
/// Headers are skipped silently; sources in a language that was not
/// enabled are skipped with a warning when `report` is set.
pub(crate) fn compiled_sources<'t>(
    target: &'t Target,
    toolchain: &ToolchainConfig,
    report: bool,
) -> Vec<(&'t Utf8Path, Language)> {
    target
        .sources
        .iter()
        .filter_map(|source| {
            let language = Language::for_source(source)?;
            if toolchain.is_enabled(language) {
                return Some((source.as_path(), language));
            }
            if report {
                warn!(
                    target = target.name(),
                    source = %source,
                    %language,
                    "skipping source in a language that is not enabled"
                );
            }
            None
        })
        .collect()
}

fn canonical_output(
    target: &Target,
    directory: &Utf8Path,
    toolchain: &ToolchainConfig,
    policy: &GeneratorPolicy,
) -> OutputEntry {
    let naming = &toolchain.naming;
    let prefix = if policy.ignore_lib_prefix() {
        ""
    } else {
        naming.library_prefix
    };
    let file_name = match target.kind() {
        TargetKind::Utility => {
            return target
                .outputs
                .first()
                .map_or(OutputEntry::Symbolic, |out| OutputEntry::File(directory.join(out)));
        }
        _ if compiled_sources(target, toolchain, false).is_empty() => return OutputEntry::Empty,
        TargetKind::Executable => format!("{}{}", target.name(), naming.executable_suffix),
        TargetKind::StaticLibrary => format!("{prefix}{}{}", target.name(), naming.static_suffix),
        TargetKind::SharedLibrary => format!("{prefix}{}{}", target.name(), naming.shared_suffix),
    };
    if file_name == target.name() {
        // A suffix-less program would share its name with the target's
        // symbolic rule.
        return OutputEntry::File(directory.join("bin").join(file_name));
    }
    OutputEntry::File(directory.join(file_name))
}
