//! Op graph for the tessera content-generation IR.
//!
//! A [`Graph`] is an arena of [`Node`]s: an [`Op`] plus ordered child edges
//! addressed by [`NodeId`]. The graph is a DAG with a root set, one root per
//! evaluation state. Optimizer passes rewrite it in place through
//! [`Graph::substitute`] or the bottom-up [`rewrite_bottom_up`] engine.
//!
//! # Module Organization
//!
//! - [`op`] - Closed set of op kinds and their classification
//! - [`node`] - Arena nodes and cached per-node analysis
//! - [`graph`] - Arena, root set, substitution, extraction and linking
//! - [`visit`] - Bottom-up and top-down traversals
//! - [`rewrite`] - Bottom-up rewrite engine with path-compressed results
//! - [`program`] - Linearized subgraphs handed to an evaluator
//! - [`tree`] - ASCII tree rendering

pub mod error;
pub mod graph;
pub mod node;
pub mod op;
pub mod program;
pub mod rewrite;
pub mod tree;
pub mod visit;

#[cfg(test)]
pub mod test;

pub use error::{Error, Result};
pub use graph::{Graph, NodeId, ParentIndex, StateRoot};
pub use node::{Analysis, Node, SubgraphFlags};
pub use op::{ArithmeticOp, Arity, BlendMode, Op, Payload, Provenance, ReferenceKind};
pub use program::{Instruction, Program};
pub use rewrite::{ResultMap, rewrite_bottom_up};
pub use visit::{Recurse, Traversal, top_down, toposort, toposort_filtered};
