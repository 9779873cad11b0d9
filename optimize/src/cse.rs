//! Structural deduplication (hash-consing).
//!
//! One bottom-up sweep. Every node is looked up in a per-kind table keyed by
//! its structural hash; equality is "same op, same child ids". Because the
//! sweep is bottom-up, a node's children are already canonical when it is
//! looked up, so id equality of children is enough. The first node visited
//! becomes the representative.

use std::collections::HashMap;
use std::mem::{Discriminant, discriminant};

use smallvec::SmallVec;
use tessera_ir::{Graph, NodeId, Op, rewrite_bottom_up};

use crate::error::Result;

/// Merge structurally equal nodes. Returns whether anything changed.
#[tracing::instrument(skip_all, fields(nodes = graph.reachable_count()))]
pub fn dedup(graph: &mut Graph) -> Result<bool> {
    let mut table: HashMap<(Discriminant<Op>, u64), SmallVec<[NodeId; 2]>> = HashMap::new();
    let mut merged = 0usize;

    let changed = rewrite_bottom_up(graph, |graph, id| {
        let key = (discriminant(graph.op(id)?), graph.structural_hash(id)?);
        let bucket = table.entry(key).or_default();
        if let Some(&canonical) = bucket.iter().find(|&&c| graph.structurally_equal(c, id)) {
            if canonical == id {
                return Ok(None);
            }
            merged += 1;
            return Ok(Some(canonical));
        }
        bucket.push(id);
        Ok(None)
    })?;

    tracing::debug!(merged, changed, "structural dedup");
    Ok(changed)
}
