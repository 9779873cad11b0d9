use std::sync::Arc;

use test_case::test_case;
use tessera_ir::{Graph, Op, Program};
use tessera_value::{Category, Mesh, Value};

use crate::config::{BlockingPolicy, OptimizerConfig};
use crate::error::EvaluationError;
use crate::fold::{CandidateKind, FoldContext, discover};
use crate::passes::OptimizationPass;
use crate::test::{
    BLUE, InterpretingEvaluator, RED, bool_const, bool_param, color, color_from_scalars, constant_color, fold_with,
    loaded_mesh, mesh_const, plain_image, root, select,
};

fn config() -> OptimizerConfig {
    OptimizerConfig::builder().worker_threads(2).build()
}

#[test]
fn test_constant_subgraph_is_folded() {
    let mut graph = Graph::new();
    let tint = color_from_scalars(&mut graph, RED);
    let instance = graph.add(Op::InstanceAddColor { name: "tint".into() }, [tint]).unwrap();
    graph.add_root("main", instance);
    let evaluator = InterpretingEvaluator::default();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &evaluator, None);

    assert_eq!(report.folded, 1);
    assert_eq!(report.failures, 0);
    // Instances are not foldable; only the colour below is.
    assert_eq!(root(&graph, 0), instance);
    let folded = graph.children(instance).unwrap()[0];
    assert_eq!(constant_color(&graph, folded), Some(RED));
}

#[test]
fn test_many_candidates_fold_in_one_round() {
    let mut graph = Graph::new();
    let shared = color_from_scalars(&mut graph, BLUE);
    for i in 0..200 {
        let tint = color_from_scalars(&mut graph, RED);
        let instance = graph.add(Op::InstanceAddColor { name: format!("tint{i}").into() }, [tint]).unwrap();
        let outer = graph.add(Op::InstanceAddColor { name: "shade".into() }, [shared, instance]).unwrap();
        graph.add_root(format!("lod{i}"), outer);
    }
    let evaluator = InterpretingEvaluator::default();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &evaluator, None);

    assert_eq!(report.folded, 201);
    let folded_shared = graph.children(root(&graph, 0)).unwrap()[0];
    for slot in graph.roots() {
        let &[shade, instance] = graph.children(slot.node).unwrap() else { panic!("outer instance lost a child") };
        assert_eq!(shade, folded_shared);
        assert_eq!(constant_color(&graph, shade), Some(BLUE));
        assert_eq!(constant_color(&graph, graph.children(instance).unwrap()[0]), Some(RED));
    }
    assert!(graph.verify_acyclic().is_ok());
}

#[test]
fn test_nested_candidate_is_folded_first() {
    let mut graph = Graph::new();
    let t = bool_const(&mut graph, true);
    let cond = graph.add(Op::BoolNot, [t]).unwrap();
    let red = color(&mut graph, RED);
    let blue = color(&mut graph, BLUE);
    let pick = select(&mut graph, Category::Color, cond, red, blue);
    graph.add_root("main", pick);
    let evaluator = InterpretingEvaluator::default();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &evaluator, None);

    assert_eq!(report.folded, 2);
    assert_eq!(constant_color(&graph, root(&graph, 0)), Some(BLUE));

    let programs = evaluator.programs();
    assert_eq!(programs.len(), 2);
    assert_eq!(programs[0].category(), Some(Category::Bool));
    let outer = &programs[1];
    assert_eq!(outer.category(), Some(Category::Color));
    assert!(outer.instructions.iter().any(|i| i.op == Op::ConstantBool(false)));
    assert!(outer.instructions.iter().all(|i| i.op != Op::BoolNot));
}

#[test]
fn test_parameter_blocks_only_its_ancestors() {
    let mut graph = Graph::new();
    let p = bool_param(&mut graph, "p");
    let red = color(&mut graph, RED);
    let blue = color_from_scalars(&mut graph, BLUE);
    let pick = select(&mut graph, Category::Color, p, red, blue);
    graph.add_root("main", pick);
    let evaluator = InterpretingEvaluator::default();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &evaluator, None);

    assert_eq!(report.folded, 1);
    assert_eq!(root(&graph, 0), pick);
    let no = graph.children(pick).unwrap()[2];
    assert_eq!(constant_color(&graph, no), Some(BLUE));
}

#[test]
fn test_failed_evaluation_leaves_graph_untouched() {
    let mut graph = Graph::new();
    let t = bool_const(&mut graph, true);
    let cond = graph.add(Op::BoolNot, [t]).unwrap();
    let red = color(&mut graph, RED);
    let blue = color(&mut graph, BLUE);
    let pick = select(&mut graph, Category::Color, cond, red, blue);
    graph.add_root("main", pick);
    let before = graph.reachable_count();
    let refuse = |_: &Program, category: Category| -> Result<Value, EvaluationError> {
        Err(EvaluationError::new(category, "backend unavailable"))
    };

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &refuse, None);

    // The outer job still runs after its prerequisite failed.
    assert_eq!(report.failures, 2);
    assert!(!report.changed());
    assert_eq!(root(&graph, 0), pick);
    assert_eq!(graph.reachable_count(), before);
}

#[test]
fn test_panicking_evaluator_is_contained() {
    let mut graph = Graph::new();
    let tint = color_from_scalars(&mut graph, RED);
    graph.add_root("main", tint);
    let explode = |_: &Program, _: Category| -> Result<Value, EvaluationError> { panic!("evaluator bug") };

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &explode, None);

    assert_eq!(report.failures, 1);
    assert_eq!(root(&graph, 0), tint);
}

#[test]
fn test_category_mismatch_is_rejected() {
    let mut graph = Graph::new();
    let tint = color_from_scalars(&mut graph, RED);
    graph.add_root("main", tint);
    let wrong = |_: &Program, _: Category| -> Result<Value, EvaluationError> { Ok(Value::Bool(true)) };

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &wrong, None);

    assert_eq!(report.failures, 1);
    assert_eq!(report.folded, 0);
    assert_eq!(root(&graph, 0), tint);
}

#[test_case(512, 1, false; "large_mipmap_blocks")]
#[test_case(16, 2, true; "small_mipmap_is_exempt")]
fn test_mipmap_blocking_respects_size(size: u16, folded: usize, mipmap_folded: bool) {
    let mut graph = Graph::new();
    let image = plain_image(&mut graph, RED, size);
    let mipmap = graph.add(Op::ImageMipmap { levels: 4 }, [image]).unwrap();
    let instance = graph.add(Op::InstanceAddImage { name: "albedo".into() }, [mipmap]).unwrap();
    graph.add_root("main", instance);
    let evaluator = InterpretingEvaluator::default();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &evaluator, None);

    assert_eq!(report.folded, folded);
    let top = graph.children(instance).unwrap()[0];
    match graph.op(top).unwrap() {
        Op::ConstantImage { image, .. } => {
            assert!(mipmap_folded);
            assert_eq!(image.get().unwrap().lods, 4);
        }
        Op::ImageMipmap { .. } => {
            assert!(!mipmap_folded);
            let below = graph.children(top).unwrap()[0];
            assert!(matches!(graph.op(below).unwrap(), Op::ConstantImage { .. }));
        }
        op => panic!("unexpected {}", op.describe()),
    }
}

#[test_case(512, 0; "custom_policy_blocks_large")]
#[test_case(8, 1; "custom_policy_exempts_small")]
fn test_custom_blocking_policy(size: u16, folded: usize) {
    let mut graph = Graph::new();
    let image = plain_image(&mut graph, BLUE, size);
    graph.add_root("main", image);
    let blocking = BlockingPolicy::Custom(Arc::new(|op: &Op| matches!(op, Op::ImagePlainColor { .. })));
    let config = OptimizerConfig::builder().worker_threads(2).blocking(blocking).build();
    let evaluator = InterpretingEvaluator::default();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config, &evaluator, None);

    assert_eq!(report.folded, folded);
    assert_eq!(evaluator.calls(), folded);
}

#[test]
fn test_folded_mesh_carries_provenance_union() {
    let mut graph = Graph::new();
    let a = mesh_const(&mut graph, Mesh::new(vec![[0.0, 0.0, 0.0]]), &[3, 1]);
    let b = mesh_const(&mut graph, Mesh::new(vec![[1.0, 0.0, 0.0]]), &[2]);
    let merge = graph.add(Op::MeshMerge, [a, b]).unwrap();
    graph.add_root("main", merge);
    let evaluator = InterpretingEvaluator::default();

    let report = fold_with(&mut graph, OptimizationPass::Initial, &config(), &evaluator, None);

    assert_eq!(report.folded, 1);
    let folded = root(&graph, 0);
    assert_eq!(graph.op(folded).unwrap().provenance().unwrap().ids(), &[1, 2, 3]);
    assert_eq!(loaded_mesh(&graph, folded).positions.len(), 2);
}

#[test]
fn test_discovery_caches_flags_for_current_generation() {
    let mut graph = Graph::new();
    let p = bool_param(&mut graph, "p");
    let t = bool_const(&mut graph, true);
    let and = graph.add(Op::BoolAnd, [p, t]).unwrap();
    let not = graph.add(Op::BoolNot, [t]).unwrap();
    graph.add_root("a", and);
    graph.add_root("b", not);
    let config = config();
    let evaluator = InterpretingEvaluator::default();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let ctx = FoldContext {
        pass: OptimizationPass::Initial,
        config: &config,
        evaluator: &evaluator,
        provider: None,
        pool: &pool,
    };

    let discovery = discover(&mut graph, &ctx).unwrap();

    assert_eq!(discovery.candidates.len(), 1);
    assert_eq!(discovery.candidates[0].root, not);
    assert_eq!(discovery.candidates[0].kind, CandidateKind::Evaluate { category: Category::Bool });
    let generation = graph.generation();
    let flags = graph.node(and).unwrap().analysis.flags(generation).unwrap();
    assert!(!flags.is_constant_subgraph);
    assert!(graph.node(not).unwrap().analysis.flags(generation).unwrap().is_constant_subgraph);
    assert!(graph.node(and).unwrap().analysis.flags(generation + 1).is_none());
}
