use std::collections::HashMap;

use crate::test::{bool_const, color, not, select};
use crate::{Graph, NodeId, Op, Recurse, top_down, toposort, toposort_filtered};

fn position(order: &[NodeId]) -> HashMap<NodeId, usize> {
    order.iter().enumerate().map(|(i, id)| (*id, i)).collect()
}

#[test]
fn test_toposort_children_first_and_unique() {
    let mut graph = Graph::new();
    let t = bool_const(&mut graph, true);
    let red = color(&mut graph, 1.0, 0.0, 0.0);
    let a = select(&mut graph, t, red, red);
    let b = select(&mut graph, t, red, a);

    let traversal = toposort(&graph, &[b, a]);

    assert_eq!(traversal.order.len(), 4);
    assert!(traversal.back_edges.is_empty());
    let pos = position(&traversal.order);
    for &id in &traversal.order {
        for child in graph.children(id).unwrap() {
            assert!(pos[child] < pos[&id]);
        }
    }
}

#[test]
fn test_toposort_filtered_skips_gated_branches() {
    let mut graph = Graph::new();
    let t = bool_const(&mut graph, true);
    let inner = not(&mut graph, t);
    let outer = not(&mut graph, inner);

    let traversal = toposort_filtered(&graph, &[outer], |id, _| id != inner);

    assert_eq!(traversal.order, vec![outer]);
}

#[test]
fn test_toposort_survives_cycles() {
    let mut graph = Graph::new();
    let t = bool_const(&mut graph, true);
    let x = not(&mut graph, t);
    let y = not(&mut graph, x);
    // Corrupt the DAG on purpose, bypassing the checks of `substitute`.
    graph.set_child(x, 0, y).unwrap();

    let traversal = toposort(&graph, &[y]);

    assert_eq!(traversal.back_edges, vec![(x, y)]);
    assert_eq!(traversal.order, vec![x, y]);
    assert!(graph.verify_acyclic().is_err());
}

#[test]
fn test_top_down_parents_first_with_pruning() {
    let mut graph = Graph::new();
    let t = bool_const(&mut graph, true);
    let n = not(&mut graph, t);
    let red = color(&mut graph, 1.0, 0.0, 0.0);
    let sel = select(&mut graph, n, red, red);

    let mut seen = Vec::new();
    top_down(&graph, &[sel], |id, node| {
        seen.push(id);
        if matches!(node.op(), Op::BoolNot) { Recurse::Skip } else { Recurse::Children }
    });

    assert_eq!(seen, vec![sel, n, red]);
}
