//! Candidate discovery and dependency linking.

use std::collections::HashMap;

use smallvec::SmallVec;
use tessera_ir::{Graph, NodeId, ReferenceKind, SubgraphFlags, toposort};
use tessera_value::Category;

use super::FoldContext;
use crate::error::Result;
use crate::passes::size::infer_sizes;

/// What a fold job does with its candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// Evaluate the cloned subgraph to a value of `category`.
    Evaluate { category: Category },
    /// Ask the provider for the external resource `id`.
    Resolve { id: u32, kind: ReferenceKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub root: NodeId,
    pub kind: CandidateKind,
    /// Indices of the nearest candidates nested inside this one.
    pub prerequisites: SmallVec<[usize; 4]>,
}

/// Candidates in bottom-up order: prerequisites always precede their dependents.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub candidates: Vec<Candidate>,
}

/// Flags assumed for a child that has none in this generation (only possible across a cycle).
const UNKNOWN: SubgraphFlags = SubgraphFlags { generation: 0, is_constant_subgraph: false, has_blocking_op: true };

/// Compute subgraph flags for the current generation and collect fold candidates.
pub fn discover(graph: &mut Graph, ctx: &FoldContext<'_>) -> Result<Discovery> {
    let generation = graph.next_generation();
    let references_live = ctx.resolves_references();
    let sizes = infer_sizes(graph)?;
    let order = toposort(graph, &graph.root_nodes()).order;

    let mut discovery = Discovery::default();
    let mut index_of: HashMap<NodeId, usize> = HashMap::new();
    // Nearest candidates strictly below a constant, non-candidate node.
    let mut below: HashMap<NodeId, SmallVec<[usize; 4]>> = HashMap::new();

    for id in order {
        let node = graph.node(id)?;
        let op = node.op();

        let opaque_reference = op.reference().is_some() && !references_live;
        let mut is_constant = !op.is_parameter() && !opaque_reference;
        let mut has_blocking = ctx.config.blocking.blocks(op, sizes.get(&id).copied(), ctx.config.small_image_pixels);
        let mut nested: SmallVec<[usize; 4]> = SmallVec::new();
        for &child in node.children() {
            let flags = graph.node(child)?.analysis.flags(generation).unwrap_or(UNKNOWN);
            is_constant &= flags.is_constant_subgraph;
            has_blocking |= flags.has_blocking_op;
            match index_of.get(&child) {
                Some(&index) => nested.push(index),
                None => nested.extend(below.get(&child).into_iter().flatten().copied()),
            }
        }
        nested.sort_unstable();
        nested.dedup();

        let kind = match op.reference() {
            Some((reference, kind)) if references_live => Some(CandidateKind::Resolve { id: reference, kind }),
            _ if is_constant && !has_blocking && !op.is_constant() && op.category().is_foldable() => {
                Some(CandidateKind::Evaluate { category: op.category() })
            }
            _ => None,
        };

        match kind {
            Some(kind) => {
                tracing::trace!(node = %id, ?kind, prerequisites = nested.len(), "fold candidate");
                index_of.insert(id, discovery.candidates.len());
                discovery.candidates.push(Candidate { root: id, kind, prerequisites: nested });
            }
            None if is_constant && !nested.is_empty() => {
                below.insert(id, nested);
            }
            None => {}
        }

        graph.node_mut(id)?.analysis.subgraph =
            Some(SubgraphFlags { generation, is_constant_subgraph: is_constant, has_blocking_op: has_blocking });
    }

    Ok(discovery)
}
