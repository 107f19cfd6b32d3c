//! Lazy topological traversal.

use std::collections::BTreeSet;

use super::{Target, TargetGraph, TargetId};

/// Iterator yielding targets so every dependency precedes its dependents.
///
/// Produced by [`TargetGraph::topological_order`] after the graph has been
/// checked for cycles. Among targets that are ready at the same time the one
/// declared first is yielded first, which keeps generated output stable.
#[derive(Debug)]
pub struct TopologicalOrder<'g> {
    graph: &'g TargetGraph,
    pending: Vec<usize>,
    dependents: Vec<Vec<TargetId>>,
    ready: BTreeSet<TargetId>,
}

impl<'g> TopologicalOrder<'g> {
    pub(super) fn new(graph: &'g TargetGraph) -> Self {
        let count = graph.len();
        let mut pending = vec![0usize; count];
        let mut dependents: Vec<Vec<TargetId>> = vec![Vec::new(); count];
        for edge in graph.edges() {
            let Some(dependency) = graph.find(&edge.dependency) else {
                continue;
            };
            if let (Some(slot), Some(list)) = (
                pending.get_mut(edge.dependent.0),
                dependents.get_mut(dependency.0),
            ) {
                // Duplicate edges between the same pair count once each way.
                if !list.contains(&edge.dependent) {
                    *slot += 1;
                    list.push(edge.dependent);
                }
            }
        }
        let ready = pending
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(idx, _)| TargetId(idx))
            .collect();
        Self {
            graph,
            pending,
            dependents,
            ready,
        }
    }
}

impl<'g> Iterator for TopologicalOrder<'g> {
    type Item = &'g Target;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.ready.pop_first()?;
        if let Some(list) = self.dependents.get(next.0) {
            for dependent in list {
                if let Some(slot) = self.pending.get_mut(dependent.0) {
                    *slot = slot.saturating_sub(1);
                    if *slot == 0 {
                        self.ready.insert(*dependent);
                    }
                }
            }
        }
        self.graph.target(next)
    }
}
