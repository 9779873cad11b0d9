use std::sync::Arc;

use test_case::test_case;
use tessera_ir::{Graph, NodeId, Op, Payload, Provenance};
use tessera_value::{ContentDigest, Mesh, Value};

use crate::config::OptimizerConfig;
use crate::fold::FoldReport;
use crate::passes::OptimizationPass;
use crate::test::{
    CountingLoader, InterpretingEvaluator, TableProvider, deferred, fold_with, loaded_mesh, mesh_const, root,
};

fn config() -> OptimizerConfig {
    OptimizerConfig::builder().worker_threads(2).build()
}

/// `InstanceAddMesh(MeshMerge(MeshReference(7), constant))`
fn reference_graph() -> Graph {
    let mut graph = Graph::new();
    let reference = graph.add(Op::MeshReference { id: 7 }, []).unwrap();
    let local = mesh_const(&mut graph, Mesh::new(vec![[0.0, 0.0, 0.0]]), &[1]);
    let merge = graph.add(Op::MeshMerge, [reference, local]).unwrap();
    let instance = graph.add(Op::InstanceAddMesh { component: 0 }, [merge]).unwrap();
    graph.add_root("main", instance);
    graph
}

fn provider() -> TableProvider {
    TableProvider::with([(7, Value::Mesh(Arc::new(Mesh::new(vec![[1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]))))])
}

#[test]
fn test_references_are_opaque_in_initial_pass() {
    let mut graph = reference_graph();
    let evaluator = InterpretingEvaluator::default();
    let provider = provider();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &evaluator, Some(&provider));

    assert_eq!(report, Default::default());
    assert_eq!(provider.calls(), 0);
    assert_eq!(evaluator.calls(), 0);
}

#[test]
fn test_resolution_pass_resolves_then_folds() {
    let mut graph = reference_graph();
    let evaluator = InterpretingEvaluator::default();
    let provider = provider();

    let report = fold_with(&mut graph, OptimizationPass::ReferenceResolution, &config(), &evaluator, Some(&provider));

    assert_eq!(report.resolved, 1);
    assert_eq!(report.folded, 1);
    assert_eq!(provider.calls(), 1);
    let merged = graph.children(root(&graph, 0)).unwrap()[0];
    assert_eq!(loaded_mesh(&graph, merged).positions.len(), 3);
}

#[test]
fn test_resolution_needs_a_provider() {
    let mut graph = reference_graph();
    let evaluator = InterpretingEvaluator::default();

    let report = fold_with(&mut graph, OptimizationPass::ReferenceResolution, &config(), &evaluator, None);

    assert!(!report.changed());
    assert_eq!(evaluator.calls(), 0);
}

#[test]
fn test_resolution_can_be_disabled() {
    let mut graph = reference_graph();
    let evaluator = InterpretingEvaluator::default();
    let provider = provider();
    let config = OptimizerConfig::builder().worker_threads(2).resolve_references(false).build();

    let report = fold_with(&mut graph, OptimizationPass::ReferenceResolution, &config, &evaluator, Some(&provider));

    assert!(!report.changed());
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_unknown_reference_stays_in_graph() {
    let mut graph = reference_graph();
    let evaluator = InterpretingEvaluator::default();
    let provider = TableProvider::default();

    let report = fold_with(&mut graph, OptimizationPass::ReferenceResolution, &config(), &evaluator, Some(&provider));

    assert_eq!(report.resolved, 0);
    // The merge is still attempted once the failed resolution releases it, and fails on the reference.
    assert_eq!(report.failures, 2);
    let merge = graph.children(root(&graph, 0)).unwrap()[0];
    let reference = graph.children(merge).unwrap()[0];
    assert_eq!(graph.op(reference).unwrap(), &Op::MeshReference { id: 7 });
}

/// A stand-in for reference 7, either resident or still in the backing store.
fn stand_in(graph: &mut Graph, resident: bool) -> (NodeId, Arc<CountingLoader<Mesh>>) {
    let mesh = Mesh::reference(7);
    let (resource, loader) = deferred(mesh.digest(), Some(mesh.clone()));
    let op = if resident {
        Op::constant_mesh(Arc::new(mesh), Provenance::new([4]))
    } else {
        Op::ConstantMesh { mesh: Payload(resource), provenance: Provenance::new([4]), reference: Some(7) }
    };
    (graph.add(op, []).unwrap(), loader)
}

#[test_case(true; "resident")]
#[test_case(false; "deferred")]
fn test_stand_in_mesh_is_resolved_whatever_its_load_state(resident: bool) {
    let mut graph = Graph::new();
    let (stand_in, loader) = stand_in(&mut graph, resident);
    graph.add_root("main", stand_in);
    let evaluator = InterpretingEvaluator::default();
    let provider = provider();

    let report = fold_with(&mut graph, OptimizationPass::ReferenceResolution, &config(), &evaluator, Some(&provider));

    assert_eq!(report.resolved, 1);
    assert_eq!(loader.loads(), 0);
    let resolved = root(&graph, 0);
    assert!(!loaded_mesh(&graph, resolved).is_reference());
    assert_eq!(graph.op(resolved).unwrap().provenance().unwrap().ids(), &[4]);
}

#[test_case(true; "resident")]
#[test_case(false; "deferred")]
fn test_stand_in_mesh_is_opaque_in_initial_pass(resident: bool) {
    let mut graph = Graph::new();
    let (stand_in, _loader) = stand_in(&mut graph, resident);
    let local = mesh_const(&mut graph, Mesh::new(vec![[0.0, 0.0, 0.0]]), &[1]);
    let merge = graph.add(Op::MeshMerge, [stand_in, local]).unwrap();
    let instance = graph.add(Op::InstanceAddMesh { component: 0 }, [merge]).unwrap();
    graph.add_root("main", instance);
    let evaluator = InterpretingEvaluator::default();
    let provider = provider();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &evaluator, Some(&provider));

    assert_eq!(report, FoldReport::default());
    assert_eq!(evaluator.calls(), 0);
    assert_eq!(graph.children(root(&graph, 0)).unwrap(), &[merge]);
    assert_eq!(graph.children(merge).unwrap()[0], stand_in);
}
