//! Arena nodes.

use std::sync::OnceLock;

use enumset::EnumSet;
use smallvec::SmallVec;
use tessera_value::MeshFeature;

use crate::graph::NodeId;
use crate::op::Op;

/// Subgraph flags computed by the folding scheduler for one pass generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubgraphFlags {
    pub generation: u32,
    /// No parameter (or unresolved reference) is reachable below the node.
    pub is_constant_subgraph: bool,
    /// A size-explosion-risk op is reachable below the node.
    pub has_blocking_op: bool,
}

/// Per-node analysis results cached by optimizer passes.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub subgraph: Option<SubgraphFlags>,
    /// Constant mesh whose skeleton must survive until evaluation.
    pub skeleton_required: bool,
    /// Format classification of a constant mesh, filled by the final post-pass.
    pub mesh_features: Option<EnumSet<MeshFeature>>,
}

impl Analysis {
    /// Subgraph flags if they were computed for `generation`.
    pub fn flags(&self, generation: u32) -> Option<SubgraphFlags> {
        self.subgraph.filter(|f| f.generation == generation)
    }
}

/// One instruction of the graph: an op plus its ordered child edges.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) op: Op,
    pub(crate) children: SmallVec<[NodeId; 4]>,
    pub(crate) hash: OnceLock<u64>,
    pub(crate) linked_address: Option<u32>,
    pub analysis: Analysis,
}

impl Node {
    pub(crate) fn new(op: Op, children: SmallVec<[NodeId; 4]>) -> Self {
        Self { op, children, hash: OnceLock::new(), linked_address: None, analysis: Analysis::default() }
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }

    /// Address assigned when the node was lowered into a [`crate::Program`].
    pub fn linked_address(&self) -> Option<u32> {
        self.linked_address
    }

    /// Drop everything derived from the node's edges.
    pub(crate) fn invalidate(&mut self) {
        self.hash = OnceLock::new();
        self.linked_address = None;
    }
}
