//! Per-directory makefile generation.
//!
//! A [`LocalGenerator`] owns the targets of one source directory. It lowers
//! them into backend-neutral [`Rule`]s and renders those rules as makefile
//! lines under the [`GeneratorPolicy`] it was configured with. It borrows the
//! shared [`GeneratorContext`] for graph, toolchain and output lookups and
//! never mutates it.

mod command;
mod lower;
mod paths;
mod registry;
mod render;
mod rule;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::config::ToolchainConfig;
use crate::generator::GenerateError;
use crate::graph::{DirectoryId, FlagSet, GraphError, TargetGraph, TargetId};
use crate::policy::{GeneratorPolicy, PolicyError};

pub use command::{CommandKind, CommandSpec, Location, Token};
pub use registry::{OutputEntry, OutputRegistry};
pub use rule::{Prerequisite, Rule};

/// Read-only state shared by every local generator of one run.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'g> {
    /// The resolved target graph.
    pub graph: &'g TargetGraph,
    /// Toolchain populated when languages were enabled.
    pub toolchain: &'g ToolchainConfig,
    /// Canonical output of every target.
    pub outputs: &'g OutputRegistry,
    /// Global topological order.
    pub order: &'g [TargetId],
    /// Source root as spelled from the build root.
    pub source_root: &'g Utf8Path,
    /// File name of each directory makefile.
    pub makefile_name: &'g str,
    /// Backend display name for the header.
    pub generator_name: &'g str,
    /// Project name for the header.
    pub project: &'g str,
}

/// Rules lowered from one target.
#[derive(Debug, Clone)]
struct TargetBlock {
    id: TargetId,
    name: String,
    flags: Option<TargetFlags>,
    rules: Vec<Rule>,
    /// Index of the rule that receives extra steps from `add_rule`.
    primary: usize,
}

/// Flags written to a target's `flags.make`.
#[derive(Debug, Clone)]
struct TargetFlags {
    file: Utf8PathBuf,
    variable: String,
    source_dir: Utf8PathBuf,
    set: FlagSet,
}

/// Lowers and renders the targets of one directory.
#[derive(Debug)]
pub struct LocalGenerator<'g> {
    ctx: GeneratorContext<'g>,
    directory: DirectoryId,
    path: Utf8PathBuf,
    parent: Option<DirectoryId>,
    policy: Option<&'g GeneratorPolicy>,
    blocks: IndexMap<String, TargetBlock>,
    foreign: IndexMap<String, Rule>,
}

impl<'g> LocalGenerator<'g> {
    /// Create the generator for `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownDirectory`] when the directory is not in
    /// the graph's tree.
    pub fn new(ctx: GeneratorContext<'g>, directory: DirectoryId) -> Result<Self, GenerateError> {
        let dir = ctx
            .graph
            .directories()
            .get(directory)
            .ok_or(GraphError::UnknownDirectory {
                index: directory.index(),
            })?;
        Ok(Self {
            ctx,
            directory,
            path: dir.path.clone(),
            parent: dir.parent,
            policy: None,
            blocks: IndexMap::new(),
            foreign: IndexMap::new(),
        })
    }

    /// Apply `policy` for the rest of this directory's processing.
    pub fn configure(&mut self, policy: &'g GeneratorPolicy) {
        self.policy = Some(policy);
    }

    /// Directory handled by this generator.
    #[must_use]
    pub const fn directory(&self) -> DirectoryId {
        self.directory
    }

    /// Directory path relative to the source and build roots.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Path of the rendered makefile relative to the build root.
    #[must_use]
    pub fn makefile_path(&self) -> Utf8PathBuf {
        self.path.join(self.ctx.makefile_name)
    }

    /// Number of directories between this one and the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        let tree = self.ctx.graph.directories();
        let mut depth = 0;
        let mut current = self.parent;
        while let Some(id) = current {
            depth += 1;
            current = tree.get(id).and_then(|dir| dir.parent);
        }
        depth
    }

    /// Lower every target of this directory in topological order.
    ///
    /// # Errors
    ///
    /// Propagates the first lowering failure.
    pub fn lower_all(&mut self) -> Result<(), GenerateError> {
        let ctx = self.ctx;
        for id in ctx.order {
            if ctx
                .graph
                .target(*id)
                .is_some_and(|t| t.directory() == self.directory)
            {
                self.lower(*id)?;
            }
        }
        Ok(())
    }

    /// Register an extra build step on the primary rule of `target`.
    ///
    /// Steps for a target that lowered to nothing are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::UnresolvedDependency`] when `target` is not
    /// owned by this directory.
    pub fn add_rule(&mut self, target: &str, command: CommandSpec) -> Result<(), GenerateError> {
        if let Some(block) = self.blocks.get_mut(target) {
            if let Some(rule) = block.rules.get_mut(block.primary) {
                rule.commands.push(command);
            }
            return Ok(());
        }
        let owned_here = self
            .ctx
            .graph
            .find(target)
            .and_then(|id| self.ctx.graph.target(id))
            .is_some_and(|t| t.directory() == self.directory);
        if owned_here {
            tracing::debug!(target, "dropping step for a target without rules");
            return Ok(());
        }
        Err(GenerateError::UnresolvedDependency {
            dependent: self.display_name(),
            dependency: target.to_owned(),
        })
    }

    /// Rules lowered so far, target blocks first, in render order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.blocks
            .values()
            .flat_map(|block| block.rules.iter())
            .chain(self.foreign.values())
    }

    /// Names of the targets that produced rules, in topological order.
    pub fn lowered_targets(&self) -> impl Iterator<Item = (TargetId, &str)> {
        self.blocks.values().map(|b| (b.id, b.name.as_str()))
    }

    fn policy(&self) -> Result<&'g GeneratorPolicy, PolicyError> {
        self.policy.ok_or_else(|| PolicyError {
            knob: "policy",
            reason: "the local generator was rendered before being configured".into(),
        })
    }

    fn display_name(&self) -> String {
        if self.path.as_str().is_empty() {
            "directory '.'".to_owned()
        } else {
            format!("directory '{}'", self.path)
        }
    }
}

#[cfg(test)]
mod tests;
