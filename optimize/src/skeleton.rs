//! Skeleton unification.
//!
//! Meshes combined at one merge point ([`Op::InstanceAddMesh`]) must share
//! a skeleton if any of them is posed, clipped by bones or reshaped further
//! down the line. The unifier computes the union of the skeletons of every
//! constant mesh feeding a merge point and rewrites the skeleton-required
//! ones against it.
//!
//! A constant mesh may feed several merge points whose unions differ, so
//! rewriting happens per merge point: the path from the merge point down
//! to each remapped leaf is copied, and the merge point is re-pointed at
//! the copy. Each distinct (node, target skeleton) pair is built once.
//!
//! A merge point is rewritten only once every remap it needs has succeeded.
//! If the remapper refuses one, the merge point stays as authored.
//!
//! Remapped meshes share geometry with their source but not its skeleton,
//! so resource dedup keeps them apart.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tessera_ir::{Graph, NodeId, Op, Recurse, top_down, toposort, toposort_filtered};
use tessera_value::{ContentDigest, Digest, Mesh, Skeleton};

use crate::collab::SkeletonRemapper;
use crate::error::Result;

/// Outcome of one unification run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifyReport {
    /// Every rewritten merge point with the skeleton its meshes now share.
    pub merge_points: Vec<(NodeId, Skeleton)>,
    /// Number of constant meshes created by remapping.
    pub remapped: usize,
    /// Merge points left as authored because the remapper refused one of their meshes.
    pub skipped: Vec<NodeId>,
}

/// Mark constant meshes below skeleton-requiring ops. Returns the marked set.
fn mark_required(graph: &mut Graph) -> Result<HashSet<NodeId>> {
    let order = toposort(graph, &graph.root_nodes()).order;
    let mut requiring = Vec::new();
    for &id in &order {
        graph.node_mut(id)?.analysis.skeleton_required = false;
        if graph.op(id)?.requires_skeleton() {
            requiring.push(id);
        }
    }

    let mut required = HashSet::new();
    top_down(graph, &requiring, |id, node| match node.op() {
        Op::ConstantMesh { .. } => {
            required.insert(id);
            Recurse::Skip
        }
        op if op.is_instance() => Recurse::Skip,
        _ => Recurse::Children,
    });

    for &id in &required {
        graph.node_mut(id)?.analysis.skeleton_required = true;
    }
    Ok(required)
}

/// Constant mesh leaves feeding `mesh_input`, without crossing into other instances.
fn contributing_leaves(graph: &Graph, mesh_input: NodeId) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    top_down(graph, &[mesh_input], |id, node| match node.op() {
        Op::ConstantMesh { .. } => {
            leaves.push(id);
            Recurse::Skip
        }
        op if op.is_instance() => Recurse::Skip,
        _ => Recurse::Children,
    });
    leaves
}

fn loaded_mesh(graph: &Graph, id: NodeId) -> Result<Option<Arc<Mesh>>> {
    let Op::ConstantMesh { mesh, .. } = graph.op(id)? else {
        return Ok(None);
    };
    match mesh.get() {
        Ok(mesh) => Ok(Some(mesh.clone())),
        Err(err) => {
            tracing::warn!(node = %id, error = %err, "mesh payload failed to load, excluded from unification");
            Ok(None)
        }
    }
}

struct Unifier<'a> {
    remapper: &'a dyn SkeletonRemapper,
    required: HashSet<NodeId>,
    /// (original node, target skeleton digest) -> rewritten node.
    built: HashMap<(NodeId, Digest), NodeId>,
    report: UnifyReport,
}

impl Unifier<'_> {
    fn unify_merge_point(&mut self, graph: &mut Graph, merge_point: NodeId) -> Result<()> {
        let mesh_input = graph.children(merge_point)?[0];

        let mut union: Option<Skeleton> = None;
        let mut to_remap = Vec::new();
        for leaf in contributing_leaves(graph, mesh_input) {
            let Some(mesh) = loaded_mesh(graph, leaf)? else { continue };
            let Some(skeleton) = &mesh.skeleton else { continue };
            union = Some(match union {
                Some(u) => u.union(skeleton),
                None => skeleton.clone(),
            });
            if self.required.contains(&leaf) {
                to_remap.push((leaf, mesh));
            }
        }
        let Some(union) = union else {
            return Ok(());
        };
        to_remap.retain(|(_, mesh)| mesh.skeleton.as_ref() != Some(&union));
        if to_remap.is_empty() {
            return Ok(());
        }

        // Every remap must succeed before the graph is touched.
        let target = union.digest();
        let mut remapped = Vec::new();
        for (leaf, mesh) in &to_remap {
            if self.built.contains_key(&(*leaf, target)) {
                continue;
            }
            match self.remapper.remap_skeleton(mesh, &union) {
                Ok(mesh) => remapped.push((*leaf, mesh)),
                Err(err) => {
                    tracing::warn!(
                        merge_point = %merge_point,
                        leaf = %leaf,
                        error = %err,
                        "mesh remap failed, merge point left as is"
                    );
                    self.report.skipped.push(merge_point);
                    return Ok(());
                }
            }
        }
        for (leaf, mesh) in remapped {
            let provenance = graph.op(leaf)?.provenance().cloned().unwrap_or_default();
            let node = graph.add(Op::constant_mesh(Arc::new(mesh), provenance), [])?;
            graph.node_mut(node)?.analysis.skeleton_required = true;
            self.built.insert((leaf, target), node);
            self.report.remapped += 1;
        }

        // Copy every node on a path from the merge point's mesh input to a remapped leaf.
        let order = toposort_filtered(graph, &[mesh_input], |_, node| !node.op().is_instance()).order;
        let mut rewritten: HashMap<NodeId, NodeId> = HashMap::new();
        for id in order {
            if let Some(&done) = self.built.get(&(id, target)) {
                rewritten.insert(id, done);
                continue;
            }
            let node = graph.node(id)?;
            let children: Vec<NodeId> = node.children().iter().map(|c| *rewritten.get(c).unwrap_or(c)).collect();
            if children.as_slice() == node.children() {
                continue;
            }
            let op = node.op().clone();
            let copy = graph.add(op, children)?;
            self.built.insert((id, target), copy);
            rewritten.insert(id, copy);
        }

        if let Some(&new_input) = rewritten.get(&mesh_input) {
            graph.set_child(merge_point, 0, new_input)?;
        }
        tracing::debug!(merge_point = %merge_point, bones = union.len(), remapped = to_remap.len(), "skeleton unified");
        self.report.merge_points.push((merge_point, union));
        Ok(())
    }
}

/// Unify the skeletons of meshes feeding every merge point reachable from the roots.
#[tracing::instrument(skip_all)]
pub fn unify_skeletons(graph: &mut Graph, remapper: &dyn SkeletonRemapper) -> Result<UnifyReport> {
    let required = mark_required(graph)?;
    if required.is_empty() {
        tracing::debug!("no skeleton-required meshes");
        return Ok(UnifyReport::default());
    }

    let merge_points: Vec<NodeId> = toposort(graph, &graph.root_nodes())
        .order
        .into_iter()
        .filter(|&id| matches!(graph.op(id), Ok(Op::InstanceAddMesh { .. })))
        .collect();

    let mut unifier = Unifier { remapper, required, built: HashMap::new(), report: UnifyReport::default() };
    for merge_point in merge_points {
        unifier.unify_merge_point(graph, merge_point)?;
    }
    Ok(unifier.report)
}
