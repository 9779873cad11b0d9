//! Node arena and root set.
//!
//! Nodes live in a flat arena addressed by [`NodeId`]. Edges are ids, so a
//! rewrite never performs pointer surgery: substitution rewrites the target
//! id of every affected edge, and unreachable slots are reclaimed by
//! [`Graph::collect_garbage`] and reused by later insertions.
//!
//! # Root set
//!
//! Every evaluation state (an LOD, a platform permutation, ...) owns one
//! [`StateRoot`]. Roots are slots: rewrites that replace a root node update
//! the slot, so callers always read the current node through
//! [`Graph::roots`].
//!
//! # Example
//!
//! ```rust
//! use tessera_ir::{Graph, Op};
//! use tessera_value::{Category, Color};
//!
//! let mut graph = Graph::new();
//! let cond = graph.add(Op::ConstantBool(true), [])?;
//! let red = graph.add(Op::ConstantColor(Color::new(1.0, 0.0, 0.0, 1.0)), [])?;
//! let select = graph.add(Op::Conditional { category: Category::Color }, [cond, red, red])?;
//! graph.add_root("lod0", select);
//!
//! assert_eq!(graph.reachable_count(), 3);
//! # Ok::<(), tessera_ir::Error>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};
use xxhash_rust::xxh64::Xxh64;

use crate::error::*;
use crate::node::Node;
use crate::op::Op;
use crate::program::{Instruction, Program};
use crate::rewrite::ResultMap;
use crate::visit;

/// Stable index of a node inside its [`Graph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Debug, derive_more::Display)]
#[debug("%{_0}")]
#[display("%{_0}")]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Parents of the nodes reachable from the roots at the time it was built.
///
/// See [`Graph::replace_leaf`] for when it stays valid.
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    parents: HashMap<NodeId, SmallVec<[NodeId; 2]>>,
}

impl ParentIndex {
    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        self.parents.get(&id).map(SmallVec::as_slice).unwrap_or_default()
    }
}

/// Root slot of one evaluation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRoot {
    pub name: Arc<str>,
    pub node: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    free: Vec<u32>,
    roots: Vec<StateRoot>,
    generation: u32,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Child ids must be live and their count must match the op's arity.
    pub fn add(&mut self, op: Op, children: impl IntoIterator<Item = NodeId>) -> Result<NodeId> {
        let children: SmallVec<[NodeId; 4]> = children.into_iter().collect();
        let arity = op.arity();
        ensure!(
            arity.accepts(children.len()),
            ArityMismatchSnafu { op: op.name(), expected: arity, actual: children.len() }
        );
        for &child in &children {
            self.node(child)?;
        }

        let node = Node::new(op, children);
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                (self.nodes.len() - 1) as u32
            }
        };
        Ok(NodeId(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).context(UnknownNodeSnafu { id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut).context(UnknownNodeSnafu { id })
    }

    pub fn op(&self, id: NodeId) -> Result<&Op> {
        Ok(self.node(id)?.op())
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    /// All live nodes, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    pub fn add_root(&mut self, name: impl Into<Arc<str>>, node: NodeId) -> usize {
        self.roots.push(StateRoot { name: name.into(), node });
        self.roots.len() - 1
    }

    pub fn roots(&self) -> &[StateRoot] {
        &self.roots
    }

    /// Current node of every root slot, in slot order.
    pub fn root_nodes(&self) -> Vec<NodeId> {
        self.roots.iter().map(|r| r.node).collect()
    }

    pub fn set_root(&mut self, index: usize, node: NodeId) -> Result<()> {
        self.node(node)?;
        let slot = self.roots.get_mut(index).context(RootOutOfRangeSnafu { index })?;
        slot.node = node;
        Ok(())
    }

    /// Current analysis generation. Cached subgraph flags from older generations are stale.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Start a new analysis generation, invalidating all cached subgraph flags.
    pub fn next_generation(&mut self) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Hash of the op and the child identities, cached until the node's edges change.
    ///
    /// For constants the op hash covers the payload digest, never the payload itself.
    pub fn structural_hash(&self, id: NodeId) -> Result<u64> {
        let node = self.node(id)?;
        Ok(*node.hash.get_or_init(|| {
            let mut hasher = Xxh64::new(0);
            node.op.hash(&mut hasher);
            node.children.hash(&mut hasher);
            hasher.finish()
        }))
    }

    /// Same op and pointer-equal children, in order.
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(x), Some(y)) => a == b || (x.op == y.op && x.children == y.children),
            _ => false,
        }
    }

    /// Point child slot `index` of `id` at `child`.
    pub fn set_child(&mut self, id: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.node(child)?;
        let node = self.node_mut(id)?;
        let slot = node.children.get_mut(index).context(ChildOutOfRangeSnafu { id, index })?;
        if *slot != child {
            *slot = child;
            node.invalidate();
        }
        Ok(())
    }

    /// Redirect every edge and root pointing at a key of `map` to its value.
    ///
    /// Chains (`a -> b`, `b -> c`) are followed to their end. The graph is
    /// checked for cycles afterwards; a cycle is fatal because any later
    /// traversal would be unsound. Returns the number of rewired edges.
    #[tracing::instrument(skip_all, fields(entries = map.len()))]
    pub fn substitute(&mut self, map: &HashMap<NodeId, NodeId>) -> Result<usize> {
        if map.is_empty() {
            return Ok(0);
        }
        let mut results = ResultMap::from_map(map);
        for &target in map.values() {
            self.node(results.resolve(target)?)?;
        }

        let mut rewired = 0;
        for node in self.nodes.iter_mut().flatten() {
            let mut dirty = false;
            for child in node.children.iter_mut() {
                let target = results.resolve(*child)?;
                if target != *child {
                    *child = target;
                    dirty = true;
                    rewired += 1;
                }
            }
            if dirty {
                node.invalidate();
            }
        }
        for root in &mut self.roots {
            let target = results.resolve(root.node)?;
            if target != root.node {
                root.node = target;
                rewired += 1;
            }
        }

        self.verify_acyclic()?;
        tracing::trace!(rewired, "substitution applied");
        Ok(rewired)
    }

    /// Substitute `new` for `old` everywhere.
    ///
    /// Refuses when `new` reaches `old`, since every parent of `old` would then
    /// close a cycle through `new`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<usize> {
        if old == new {
            return Ok(0);
        }
        self.node(old)?;
        ensure!(
            !self.reaches(new, old),
            InvariantViolationSnafu { reason: format!("replacing {old} with {new} would create a cycle") }
        );
        self.substitute(&HashMap::from([(old, new)]))
    }

    /// Index the parents of every node reachable from the roots.
    pub fn parent_index(&self) -> ParentIndex {
        let mut parents: HashMap<NodeId, SmallVec<[NodeId; 2]>> = HashMap::new();
        for id in visit::toposort(self, &self.root_nodes()).order {
            let Some(node) = self.get(id) else { continue };
            for &child in &node.children {
                let list = parents.entry(child).or_default();
                if list.last() != Some(&id) {
                    list.push(id);
                }
            }
        }
        ParentIndex { parents }
    }

    /// Substitute the childless node `leaf` for `old`, touching only the
    /// parents `index` lists for `old` and the root slots.
    ///
    /// A leaf cannot close a cycle, so nothing is re-verified. `index` stays
    /// accurate across any number of leaf replacements.
    pub fn replace_leaf(&mut self, old: NodeId, leaf: NodeId, index: &ParentIndex) -> Result<usize> {
        self.node(old)?;
        ensure!(
            self.node(leaf)?.children.is_empty(),
            InvariantViolationSnafu { reason: format!("{leaf} has children and cannot replace {old} as a leaf") }
        );

        let mut rewired = 0;
        for &parent in index.parents(old) {
            let node = self.node_mut(parent)?;
            let mut dirty = false;
            for child in node.children.iter_mut().filter(|c| **c == old) {
                *child = leaf;
                dirty = true;
                rewired += 1;
            }
            if dirty {
                node.invalidate();
            }
        }
        for root in self.roots.iter_mut().filter(|r| r.node == old) {
            root.node = leaf;
            rewired += 1;
        }
        Ok(rewired)
    }

    /// Whether `to` is reachable from `from` (including `from == to`).
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.get(id) {
                stack.extend(node.children.iter().copied());
            }
        }
        false
    }

    /// Fail with [`Error::CycleDetected`] if any live node lies on a cycle.
    pub fn verify_acyclic(&self) -> Result<()> {
        let all: Vec<NodeId> = self.iter().map(|(id, _)| id).collect();
        let traversal = visit::toposort(self, &all);
        match traversal.back_edges.first() {
            Some(&(_, node)) => CycleDetectedSnafu { node }.fail(),
            None => Ok(()),
        }
    }

    /// Deep copy of the subgraph below `root` into a fresh graph without roots.
    ///
    /// Returns the copy and the id of `root` inside it.
    pub fn extract(&self, root: NodeId) -> Result<(Graph, NodeId)> {
        self.node(root)?;
        let order = visit::toposort(self, &[root]).order;
        let mut copy = Graph::new();
        let mut ids = HashMap::with_capacity(order.len());
        for id in order {
            let node = self.node(id)?;
            let children = node.children.iter().map(|c| ids.get(c).copied().context(UnknownNodeSnafu { id: *c }));
            let children = children.collect::<Result<SmallVec<[NodeId; 4]>>>()?;
            let mut cloned = Node::new(node.op.clone(), children);
            cloned.analysis = node.analysis.clone();
            copy.nodes.push(Some(cloned));
            ids.insert(id, NodeId((copy.nodes.len() - 1) as u32));
        }
        let new_root = ids.get(&root).copied().context(UnknownNodeSnafu { id: root })?;
        Ok((copy, new_root))
    }

    /// Lower the subgraph below `root` into `program` and return the address of `root`.
    ///
    /// Nodes that already carry an address are not emitted again, so linking
    /// several roots into one program shares their common subgraphs.
    pub fn link_into(&mut self, program: &mut Program, root: NodeId) -> Result<u32> {
        for id in visit::toposort(self, &[root]).order {
            if self.node(id)?.linked_address.is_some() {
                continue;
            }
            let node = self.node(id)?;
            let args = node.children.iter().map(|c| {
                let reason = || format!("child {c} of {id} has no address");
                self.node(*c)?.linked_address.with_context(|| InvariantViolationSnafu { reason: reason() })
            });
            let args = args.collect::<Result<SmallVec<[u32; 4]>>>()?;
            let address = program.push(Instruction { op: node.op.clone(), args });
            self.node_mut(id)?.linked_address = Some(address);
        }
        self.node(root)?.linked_address.context(UnknownNodeSnafu { id: root })
    }

    /// Lower the subgraph below `root` into a standalone program.
    pub fn link(&mut self, root: NodeId) -> Result<Program> {
        for node in self.nodes.iter_mut().flatten() {
            node.linked_address = None;
        }
        let mut program = Program::default();
        program.root = self.link_into(&mut program, root)?;
        Ok(program)
    }

    fn reachable(&self) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = self.root_nodes();
        while let Some(id) = stack.pop() {
            if seen.insert(id)
                && let Some(node) = self.get(id)
            {
                stack.extend(node.children.iter().copied());
            }
        }
        seen
    }

    /// Number of distinct nodes reachable from the root set.
    pub fn reachable_count(&self) -> usize {
        self.reachable().len()
    }

    /// Number of occupied arena slots, reachable or not.
    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Free every slot not reachable from the root set. Returns the number of reclaimed nodes.
    #[tracing::instrument(skip_all)]
    pub fn collect_garbage(&mut self) -> usize {
        let keep = self.reachable();
        let mut collected = 0;
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            if slot.is_some() && !keep.contains(&NodeId(index as u32)) {
                *slot = None;
                self.free.push(index as u32);
                collected += 1;
            }
        }
        tracing::debug!(collected, live = self.nodes.len() - self.free.len(), "garbage collected");
        collected
    }

    /// Compact ASCII rendering of the subgraph below `root`.
    pub fn tree(&self, root: NodeId) -> String {
        crate::tree::render_tree_compact(self, root)
    }
}
