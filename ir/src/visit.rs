//! Graph traversal utilities.
//!
//! Every traversal visits each node at most once no matter how many parents
//! reference it. A back edge (only possible after a faulty rewrite) is
//! skipped and counted in [`Traversal::back_edges`].

use std::collections::HashSet;

use crate::graph::{Graph, NodeId};
use crate::node::Node;

/// Result of a bottom-up traversal.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    /// Post-order: every node appears after all of its (admitted) children.
    pub order: Vec<NodeId>,
    /// `(parent, child)` edges that closed a cycle and were skipped.
    pub back_edges: Vec<(NodeId, NodeId)>,
}

/// Decision of a top-down visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurse {
    /// Visit the node's children.
    Children,
    /// Do not descend below this node.
    Skip,
}

/// Bottom-up post-order over everything reachable from `roots`.
pub fn toposort(graph: &Graph, roots: &[NodeId]) -> Traversal {
    toposort_filtered(graph, roots, |_, _| true)
}

/// Bottom-up post-order that only enters nodes admitted by `gate`.
///
/// Rejected nodes are excluded from the traversal together with everything
/// only reachable through them.
pub fn toposort_filtered<F>(graph: &Graph, roots: &[NodeId], mut gate: F) -> Traversal
where
    F: FnMut(NodeId, &Node) -> bool,
{
    let mut traversal = Traversal::default();
    let mut done = HashSet::new();
    let mut in_progress = HashSet::new();
    let mut stack: Vec<(NodeId, Option<NodeId>, bool)> = roots.iter().rev().map(|&r| (r, None, false)).collect();

    while let Some((id, parent, processed)) = stack.pop() {
        if processed {
            in_progress.remove(&id);
            done.insert(id);
            traversal.order.push(id);
            continue;
        }
        if done.contains(&id) {
            continue;
        }
        // Everything above an in-progress marker on the stack descends from it.
        if in_progress.contains(&id) {
            tracing::warn!(node = %id, parent = ?parent, "cycle detected, skipping back edge");
            if let Some(parent) = parent {
                traversal.back_edges.push((parent, id));
            }
            continue;
        }
        let Some(node) = graph.get(id) else {
            tracing::warn!(node = %id, "traversal reached a dead node");
            continue;
        };
        if !gate(id, node) {
            continue;
        }

        in_progress.insert(id);
        stack.push((id, parent, true));
        for &child in node.children().iter().rev() {
            if !done.contains(&child) {
                stack.push((child, Some(id), false));
            }
        }
    }

    traversal
}

/// Top-down pre-order over everything reachable from `roots`, with pruning.
///
/// Parents are visited before their children; a node shared by several
/// parents is visited once, on its first encounter.
pub fn top_down<F>(graph: &Graph, roots: &[NodeId], mut visitor: F)
where
    F: FnMut(NodeId, &Node) -> Recurse,
{
    let mut visited = HashSet::new();
    let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = graph.get(id) else {
            continue;
        };
        if visitor(id, node) == Recurse::Children {
            stack.extend(node.children().iter().rev().filter(|c| !visited.contains(*c)).copied());
        }
    }
}
