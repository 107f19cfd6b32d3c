//! In-memory target graph.
//!
//! The graph owns every [`Target`] and every [`DependencyEdge`]; targets refer
//! to each other only through names and [`TargetId`] handles. Handles are
//! assigned in declaration order, which the topological traversal uses to
//! break ties so generation is deterministic.
//!
//! # Examples
//!
//! ```
//! use makegen::graph::{DependencyKind, DirectoryId, TargetGraph, TargetKind};
//!
//! let mut graph = TargetGraph::default();
//! let lib = graph.add_target("lib", TargetKind::StaticLibrary, DirectoryId::ROOT)?;
//! let app = graph.add_target("app", TargetKind::Executable, DirectoryId::ROOT)?;
//! graph.add_dependency(app, "lib", DependencyKind::Link)?;
//! let order: Vec<&str> = graph.topological_order()?.map(|t| t.name()).collect();
//! assert_eq!(order, ["lib", "app"]);
//! # let _ = lib;
//! # Ok::<(), makegen::graph::GraphError>(())
//! ```

mod cycle;
mod directory;
mod error;
mod order;
mod target;

use std::collections::HashMap;

use camino::Utf8Path;
use serde::Serialize;
use tracing::debug;

pub use directory::{Directory, DirectoryId, DirectoryTree};
pub use error::GraphError;
pub use order::TopologicalOrder;
pub use target::{DependencyEdge, DependencyKind, FlagSet, Target, TargetId, TargetKind};

use cycle::{Adjacency, canonicalize_cycle, find_cycle, reaches};

/// Rules every directory makefile defines for itself.
pub const RESERVED_RULE_NAMES: [&str; 2] = ["all", "clean"];

/// Prefix of the rules that recurse into subdirectories.
pub const SUBDIRECTORY_RULE_PREFIX: &str = "subdir.";

fn is_reserved_name(name: &str) -> bool {
    RESERVED_RULE_NAMES.contains(&name) || name.starts_with(SUBDIRECTORY_RULE_PREFIX)
}

/// Targets, their dependency edges, and the directory tree that owns them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetGraph {
    directories: DirectoryTree,
    targets: Vec<Target>,
    #[serde(skip)]
    by_name: HashMap<String, TargetId>,
    edges: Vec<DependencyEdge>,
}

impl TargetGraph {
    /// Register a source directory, returning its handle.
    pub fn add_directory(&mut self, path: impl AsRef<Utf8Path>) -> DirectoryId {
        self.directories.add(path.as_ref())
    }

    /// The project's directory tree.
    #[must_use]
    pub const fn directories(&self) -> &DirectoryTree {
        &self.directories
    }

    /// Declare a new target owned by `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateTarget`] when the name is taken,
    /// [`GraphError::ReservedTargetName`] when it clashes with a generated
    /// directory rule, and [`GraphError::UnknownDirectory`] when `directory`
    /// is not in the tree.
    pub fn add_target(
        &mut self,
        name: impl Into<String>,
        kind: TargetKind,
        directory: DirectoryId,
    ) -> Result<TargetId, GraphError> {
        let name = name.into();
        if is_reserved_name(&name) {
            return Err(GraphError::ReservedTargetName { name });
        }
        if self.by_name.contains_key(&name) {
            return Err(GraphError::DuplicateTarget { name });
        }
        if !self.directories.contains(directory) {
            return Err(GraphError::UnknownDirectory {
                index: directory.index(),
            });
        }
        let id = TargetId(self.targets.len());
        debug!(target = %name, %kind, "declared target");
        self.by_name.insert(name.clone(), id);
        self.targets.push(Target::new(name, kind, directory));
        Ok(id)
    }

    /// Borrow a target.
    #[must_use]
    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(id.0)
    }

    /// Mutably borrow a target to adjust sources or flags before generation.
    pub fn target_mut(&mut self, id: TargetId) -> Option<&mut Target> {
        self.targets.get_mut(id.0)
    }

    /// Look up a target by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TargetId> {
        self.by_name.get(name).copied()
    }

    /// Iterate over targets in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets
            .iter()
            .enumerate()
            .map(|(idx, target)| (TargetId(idx), target))
    }

    /// Targets owned by `directory`, in declaration order.
    pub fn targets_in(&self, directory: DirectoryId) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets()
            .filter(move |(_, target)| target.directory() == directory)
    }

    /// Every dependency edge in declaration order.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Edges whose dependent is `id`, in declaration order.
    pub fn dependencies_of(&self, id: TargetId) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(move |edge| edge.dependent == id)
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the graph holds no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Record that `from` depends on the target called `to`.
    ///
    /// `to` may name a target that has not been declared yet. When it already
    /// exists and `kind` is [`DependencyKind::Link`], the edge is rejected if
    /// it would close a cycle of link edges. Repeating an identical edge is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTarget`] for a foreign handle and
    /// [`GraphError::CyclicDependency`] for a link cycle.
    pub fn add_dependency(
        &mut self,
        from: TargetId,
        to: &str,
        kind: DependencyKind,
    ) -> Result<(), GraphError> {
        if self.target(from).is_none() {
            return Err(GraphError::UnknownTarget { index: from.0 });
        }
        let edge = DependencyEdge {
            dependent: from,
            dependency: to.to_owned(),
            kind,
        };
        if self.edges.contains(&edge) {
            return Ok(());
        }
        if let (DependencyKind::Link, Some(to_id)) = (kind, self.find(to)) {
            let mut adjacency = self.adjacency(|k| k == DependencyKind::Link);
            if reaches(&adjacency, to_id, from) {
                adjacency.entry(from).or_default().push(to_id);
                let cycle = find_cycle(&[from], &adjacency).unwrap_or_else(|| vec![from, from]);
                return Err(self.cycle_error(cycle));
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Check that every edge names a declared target.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedDependency`] for the first dangling
    /// edge in declaration order.
    pub fn resolve(&self) -> Result<(), GraphError> {
        for edge in &self.edges {
            if self.find(&edge.dependency).is_none() {
                let dependent = self
                    .target(edge.dependent)
                    .map(|t| t.name().to_owned())
                    .unwrap_or_default();
                return Err(GraphError::UnresolvedDependency {
                    dependent,
                    dependency: edge.dependency.clone(),
                });
            }
        }
        Ok(())
    }

    /// Order targets so every dependency precedes its dependents.
    ///
    /// All edge kinds take part in ordering. The order is recomputed on every
    /// call; edges naming undeclared targets are ignored here and reported by
    /// [`TargetGraph::resolve`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicDependency`] when the edges form a cycle.
    pub fn topological_order(&self) -> Result<TopologicalOrder<'_>, GraphError> {
        let adjacency = self.adjacency(|_| true);
        let roots: Vec<TargetId> = (0..self.targets.len()).map(TargetId).collect();
        if let Some(cycle) = find_cycle(&roots, &adjacency) {
            return Err(self.cycle_error(cycle));
        }
        Ok(TopologicalOrder::new(self))
    }

    fn adjacency(&self, include: impl Fn(DependencyKind) -> bool) -> Adjacency {
        let mut adjacency = Adjacency::new();
        for edge in self.edges.iter().filter(|edge| include(edge.kind)) {
            if let Some(to) = self.find(&edge.dependency) {
                adjacency.entry(edge.dependent).or_default().push(to);
            }
        }
        adjacency
    }

    fn cycle_error(&self, cycle: Vec<TargetId>) -> GraphError {
        let names = cycle
            .into_iter()
            .filter_map(|id| self.target(id).map(|t| t.name().to_owned()))
            .collect();
        GraphError::CyclicDependency {
            cycle: canonicalize_cycle(names),
        }
    }
}

#[cfg(test)]
mod tests;
