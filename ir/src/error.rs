use snafu::Snafu;

use crate::graph::NodeId;
use crate::op::Arity;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The id does not address a live node of this graph.
    #[snafu(display("node {id} does not exist"))]
    UnknownNode { id: NodeId },

    /// Child count does not match what the op kind accepts.
    #[snafu(display("{op} expects {expected} children, got {actual}"))]
    ArityMismatch { op: &'static str, expected: Arity, actual: usize },

    /// Child slot past the end of a node's child list.
    #[snafu(display("node {id} has no child slot {index}"))]
    ChildOutOfRange { id: NodeId, index: usize },

    /// Root slot past the end of the root set.
    #[snafu(display("root slot {index} does not exist"))]
    RootOutOfRange { index: usize },

    /// A rewrite produced a cycle. The graph must not be traversed further.
    #[snafu(display("cycle detected through node {node}"))]
    CycleDetected { node: NodeId },

    #[snafu(display("invariant violation: {reason}"))]
    InvariantViolation { reason: String },
}
