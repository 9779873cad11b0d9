//! Random boolean graphs.
//!
//! Every instruction refers only to earlier ones, so generated graphs are
//! DAGs by construction. Parameters are named `p0`..`p2`.

use std::collections::HashMap;

use proptest::prelude::*;
use tessera_ir::{Graph, NodeId, Op};

#[derive(Debug, Clone)]
pub enum BoolInstr {
    Const(bool),
    Param(u8),
    Not(usize),
    And(usize, usize),
    Or(usize, usize),
}

fn arb_instr(params: bool) -> BoxedStrategy<BoolInstr> {
    let leaf = if params {
        prop_oneof![any::<bool>().prop_map(BoolInstr::Const), (0u8..3).prop_map(BoolInstr::Param)].boxed()
    } else {
        any::<bool>().prop_map(BoolInstr::Const).boxed()
    };
    prop_oneof![
        leaf,
        any::<usize>().prop_map(BoolInstr::Not),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| BoolInstr::And(a, b)),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| BoolInstr::Or(a, b)),
    ]
    .boxed()
}

/// Build a graph whose roots are the last node and up to two random earlier ones.
pub fn build(instrs: &[BoolInstr], extra_roots: &[usize]) -> Graph {
    let mut graph = Graph::new();
    let mut ids: Vec<NodeId> = Vec::new();
    for instr in instrs {
        let pick = |i: usize| ids[i % ids.len()];
        let id = match instr {
            BoolInstr::Const(v) => graph.add(Op::ConstantBool(*v), []),
            BoolInstr::Param(p) => graph.add(Op::BoolParameter { name: format!("p{p}").into() }, []),
            _ if ids.is_empty() => graph.add(Op::ConstantBool(true), []),
            BoolInstr::Not(a) => graph.add(Op::BoolNot, [pick(*a)]),
            BoolInstr::And(a, b) => graph.add(Op::BoolAnd, [pick(*a), pick(*b)]),
            BoolInstr::Or(a, b) => graph.add(Op::BoolOr, [pick(*a), pick(*b)]),
        };
        ids.push(id.expect("generated instruction is well formed"));
    }
    if let Some(&last) = ids.last() {
        graph.add_root("main", last);
        for (i, &extra) in extra_roots.iter().enumerate() {
            graph.add_root(format!("extra{i}"), ids[extra % ids.len()]);
        }
    }
    graph
}

fn arb_graph(params: bool) -> impl Strategy<Value = Graph> {
    (prop::collection::vec(arb_instr(params), 1..40), prop::collection::vec(any::<usize>(), 0..3))
        .prop_map(|(instrs, extra)| build(&instrs, &extra))
}

/// Graphs that may read the parameters `p0`..`p2`.
pub fn arb_bool_graph() -> impl Strategy<Value = Graph> {
    arb_graph(true)
}

/// Graphs without any parameter: every non-constant node is foldable.
pub fn arb_constant_bool_graph() -> impl Strategy<Value = Graph> {
    arb_graph(false)
}

/// Reference semantics: evaluate `id` with parameter `p{i}` bound to `env[i]`.
pub fn eval(graph: &Graph, id: NodeId, env: [bool; 3], memo: &mut HashMap<NodeId, bool>) -> bool {
    if let Some(&value) = memo.get(&id) {
        return value;
    }
    let children = graph.children(id).unwrap().to_vec();
    let value = match graph.op(id).unwrap() {
        Op::ConstantBool(v) => *v,
        Op::BoolParameter { name } => env[name[1..].parse::<usize>().unwrap()],
        Op::BoolNot => !eval(graph, children[0], env, memo),
        Op::BoolAnd => eval(graph, children[0], env, memo) & eval(graph, children[1], env, memo),
        Op::BoolOr => eval(graph, children[0], env, memo) | eval(graph, children[1], env, memo),
        op => panic!("unexpected op {}", op.describe()),
    };
    memo.insert(id, value);
    value
}

/// Value of every root under every parameter assignment.
pub fn truth_table(graph: &Graph) -> Vec<Vec<bool>> {
    (0..8u8)
        .map(|bits| {
            let env = [bits & 1 != 0, bits & 2 != 0, bits & 4 != 0];
            let mut memo = HashMap::new();
            graph.roots().iter().map(|r| eval(graph, r.node, env, &mut memo)).collect()
        })
        .collect()
}
