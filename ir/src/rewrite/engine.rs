//! Bottom-up rewrite engine.
//!
//! A single sweep over the nodes reachable from the root set, children
//! before parents. Before a node is offered to the rewrite function, its
//! child edges are redirected to whatever those children were rewritten to,
//! so the function always sees canonical children. A replacement is recorded
//! in a [`ResultMap`]; parents pick it up when they are visited, and roots are
//! redirected once the sweep is done.

use std::collections::{HashMap, HashSet};

use snafu::ensure;

use crate::error::*;
use crate::graph::{Graph, NodeId};
use crate::visit;

/// Replacement chains with path compression.
///
/// Lookups follow `a -> b -> c` to the end of the chain and then point every
/// visited entry straight at the end, so repeated lookups are O(1).
#[derive(Debug, Default, Clone)]
pub struct ResultMap {
    results: HashMap<NodeId, NodeId>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: &HashMap<NodeId, NodeId>) -> Self {
        Self { results: map.iter().filter(|(k, v)| k != v).map(|(k, v)| (*k, *v)).collect() }
    }

    pub fn insert(&mut self, from: NodeId, to: NodeId) {
        if from != to {
            self.results.insert(from, to);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Final replacement of `id`, or `id` itself.
    ///
    /// A chain that loops back onto itself is reported as a cycle.
    pub fn resolve(&mut self, id: NodeId) -> Result<NodeId> {
        let Some(&first) = self.results.get(&id) else {
            return Ok(id);
        };

        let mut path = vec![id];
        let mut seen = HashSet::from([id]);
        let mut current = first;
        while let Some(&next) = self.results.get(&current) {
            ensure!(seen.insert(current), CycleDetectedSnafu { node: current });
            path.push(current);
            current = next;
        }

        for entry in path {
            self.results.insert(entry, current);
        }
        Ok(current)
    }
}

/// Rewrite the graph bottom-up in one sweep.
///
/// `f` is called once per reachable node, after that node's children have
/// been redirected to their rewritten forms. Returning `Some(other)` replaces
/// the node for every parent and root. `f` may add nodes; it must not rewire
/// edges of nodes it was not handed.
///
/// Returns whether any edge or root changed.
pub fn rewrite_bottom_up<F>(graph: &mut Graph, mut f: F) -> Result<bool>
where
    F: FnMut(&mut Graph, NodeId) -> Result<Option<NodeId>>,
{
    let roots = graph.root_nodes();
    let order = visit::toposort(graph, &roots).order;
    let mut results = ResultMap::new();
    let mut changed = false;

    for id in order {
        let children = graph.children(id)?.to_vec();
        for (index, child) in children.into_iter().enumerate() {
            let target = results.resolve(child)?;
            if target != child {
                graph.set_child(id, index, target)?;
                changed = true;
            }
        }

        if let Some(replacement) = f(graph, id)?
            && replacement != id
        {
            tracing::trace!(node = %id, replacement = %replacement, "rewritten");
            results.insert(id, replacement);
            changed = true;
        }
    }

    for (index, root) in roots.into_iter().enumerate() {
        let target = results.resolve(root)?;
        if target != root {
            graph.set_root(index, target)?;
        }
    }

    if changed {
        graph.verify_acyclic()?;
    }
    Ok(changed)
}
