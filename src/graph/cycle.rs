//! Cycle detection utilities for the target graph.

use std::collections::HashMap;

use super::TargetId;

/// Tracks the visitation state of a node during cycle detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Adjacency lists keyed by dependent, listing resolved dependencies in
/// edge declaration order.
pub(crate) type Adjacency = HashMap<TargetId, Vec<TargetId>>;

/// Find a cycle among `nodes`, visiting roots in the order given.
///
/// The returned path starts and ends with the same node.
pub(crate) fn find_cycle(nodes: &[TargetId], edges: &Adjacency) -> Option<Vec<TargetId>> {
    let mut detector = CycleDetector::new(edges);
    for node in nodes {
        if detector.is_visited(*node) {
            continue;
        }
        if let Some(found) = detector.visit(*node) {
            return Some(found);
        }
    }
    None
}

/// Whether `to` can already reach `from`, meaning an edge `from -> to` would
/// close a cycle.
pub(crate) fn reaches(edges: &Adjacency, to: TargetId, from: TargetId) -> bool {
    let mut stack = vec![to];
    let mut seen = std::collections::HashSet::new();
    while let Some(node) = stack.pop() {
        if node == from {
            return true;
        }
        if !seen.insert(node) {
            continue;
        }
        if let Some(next) = edges.get(&node) {
            stack.extend(next.iter().copied());
        }
    }
    false
}

struct CycleDetector<'a> {
    edges: &'a Adjacency,
    stack: Vec<TargetId>,
    states: HashMap<TargetId, VisitState>,
}

impl<'a> CycleDetector<'a> {
    fn new(edges: &'a Adjacency) -> Self {
        Self {
            edges,
            stack: Vec::new(),
            states: HashMap::new(),
        }
    }

    fn is_visited(&self, node: TargetId) -> bool {
        matches!(self.states.get(&node), Some(VisitState::Visited))
    }

    fn visit(&mut self, node: TargetId) -> Option<Vec<TargetId>> {
        match self.states.get(&node) {
            Some(VisitState::Visited) => return None,
            Some(VisitState::Visiting) => {
                let idx = self.stack.iter().position(|n| *n == node).unwrap_or_else(|| {
                    debug_assert!(false, "visiting node must be on the stack");
                    0
                });
                let mut cycle: Vec<TargetId> = self.stack.iter().skip(idx).copied().collect();
                cycle.push(node);
                return Some(cycle);
            }
            None => {
                self.states.insert(node, VisitState::Visiting);
            }
        }

        self.stack.push(node);

        if let Some(deps) = self.edges.get(&node) {
            for dep in deps {
                if let Some(cycle) = self.visit(*dep) {
                    return Some(cycle);
                }
            }
        }

        self.stack.pop();
        self.states.insert(node, VisitState::Visited);
        None
    }
}

/// Rotate a closed cycle so its smallest element comes first.
///
/// The closing element is updated to match, giving a stable rendering of the
/// same cycle regardless of where traversal entered it.
pub(crate) fn canonicalize_cycle<T: Ord + Clone>(mut cycle: Vec<T>) -> Vec<T> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        slot.clone_from(&first);
    }
    cycle
}
