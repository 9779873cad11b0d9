//! Final classification of constant meshes.
//!
//! Runs once after the main loop. Every reachable constant mesh gets its
//! [`MeshFeature`](tessera_value::MeshFeature) set cached on the node for
//! the downstream evaluator.

use tessera_ir::{Graph, Op, toposort};

use crate::error::Result;

/// Cache format features on every reachable constant mesh. Returns how many were classified.
#[tracing::instrument(skip_all)]
pub fn classify_meshes(graph: &mut Graph) -> Result<usize> {
    let mut classified = 0;
    for id in toposort(graph, &graph.root_nodes()).order {
        let features = match graph.op(id)? {
            Op::ConstantMesh { mesh, .. } => match mesh.get() {
                Ok(mesh) => mesh.features(),
                Err(err) => {
                    tracing::warn!(node = %id, error = %err, "cannot classify mesh, payload failed to load");
                    continue;
                }
            },
            _ => continue,
        };
        graph.node_mut(id)?.analysis.mesh_features = Some(features);
        classified += 1;
    }
    tracing::debug!(classified, "mesh formats classified");
    Ok(classified)
}
