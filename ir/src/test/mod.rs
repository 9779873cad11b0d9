
use tessera_value::{Category, Color};

use crate::{Graph, NodeId, Op};

pub(crate) fn color(graph: &mut Graph, r: f32, g: f32, b: f32) -> NodeId {
    graph.add(Op::ConstantColor(Color::new(r, g, b, 1.0)), []).unwrap()
}

pub(crate) fn bool_const(graph: &mut Graph, value: bool) -> NodeId {
    graph.add(Op::ConstantBool(value), []).unwrap()
}

pub(crate) fn select(graph: &mut Graph, cond: NodeId, yes: NodeId, no: NodeId) -> NodeId {
    graph.add(Op::Conditional { category: Category::Color }, [cond, yes, no]).unwrap()
}

pub(crate) fn not(graph: &mut Graph, value: NodeId) -> NodeId {
    graph.add(Op::BoolNot, [value]).unwrap()
}
