//! Deduplication of constant payloads by content.
//!
//! Structural dedup only merges constants sharing a payload handle. Two
//! different recipes can still bake byte-identical meshes or images, so
//! constant leaves are additionally grouped by payload digest. Payloads are
//! only loaded and deep-compared inside buckets with at least two members;
//! the digest is a candidate filter, equality decides.

use std::collections::HashMap;

use tessera_ir::{Graph, NodeId, Op, toposort};
use tessera_value::{Category, Digest};

use crate::error::Result;

const PAYLOAD_CATEGORIES: [Category; 3] = [Category::Mesh, Category::Image, Category::Layout];

fn payload_digest(op: &Op, category: Category) -> Option<Digest> {
    match (op, category) {
        (Op::ConstantMesh { mesh, .. }, Category::Mesh) => Some(mesh.digest()),
        (Op::ConstantImage { image, .. }, Category::Image) => Some(image.digest()),
        (Op::ConstantLayout { layout }, Category::Layout) => Some(layout.digest()),
        _ => None,
    }
}

/// Deep payload equality. A payload that fails to load equals nothing.
fn same_payload(graph: &Graph, a: NodeId, b: NodeId) -> Result<bool> {
    let equal = match (graph.op(a)?, graph.op(b)?) {
        (Op::ConstantMesh { mesh: x, .. }, Op::ConstantMesh { mesh: y, .. }) => x.content_eq(y),
        (Op::ConstantImage { image: x, .. }, Op::ConstantImage { image: y, .. }) => x.content_eq(y),
        (Op::ConstantLayout { layout: x }, Op::ConstantLayout { layout: y }) => x.content_eq(y),
        _ => Ok(false),
    };
    Ok(equal.unwrap_or_else(|err| {
        tracing::warn!(lhs = %a, rhs = %b, error = %err, "payload load failed during dedup");
        false
    }))
}

/// Merge constant leaves with equal payloads. Returns whether anything changed.
#[tracing::instrument(skip_all)]
pub fn dedup_resources(graph: &mut Graph) -> Result<bool> {
    let order = toposort(graph, &graph.root_nodes()).order;
    let mut replacements = HashMap::new();

    for category in PAYLOAD_CATEGORIES {
        let mut buckets: HashMap<Digest, Vec<NodeId>> = HashMap::new();
        for &id in &order {
            if let Some(digest) = payload_digest(graph.op(id)?, category) {
                buckets.entry(digest).or_default().push(id);
            }
        }

        for bucket in buckets.values().filter(|b| b.len() >= 2) {
            let mut canonical: Vec<NodeId> = Vec::new();
            for &id in bucket {
                let mut found = None;
                for &c in &canonical {
                    if same_payload(graph, c, id)? {
                        found = Some(c);
                        break;
                    }
                }
                match found {
                    Some(c) => {
                        replacements.insert(id, c);
                    }
                    None => canonical.push(id),
                }
            }
        }
    }

    if replacements.is_empty() {
        return Ok(false);
    }
    graph.substitute(&replacements)?;
    tracing::debug!(merged = replacements.len(), "resource dedup");
    Ok(true)
}
