//! Boolean simplification.

use tessera_ir::{Graph, NodeId, Op, rewrite_bottom_up};

use super::{Pass, PassContext};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogicPass;

impl Pass for LogicPass {
    fn name(&self) -> &'static str {
        "logic"
    }

    #[tracing::instrument(skip_all, fields(pass = %ctx.pass))]
    fn run(&self, graph: &mut Graph, ctx: &PassContext<'_>) -> Result<bool> {
        let changed = rewrite_bottom_up(graph, simplify)?;
        tracing::debug!(changed, "logic pass");
        Ok(changed)
    }
}

fn constant(graph: &Graph, id: NodeId) -> tessera_ir::Result<Option<bool>> {
    Ok(match graph.op(id)? {
        Op::ConstantBool(value) => Some(*value),
        _ => None,
    })
}

fn simplify(graph: &mut Graph, id: NodeId) -> tessera_ir::Result<Option<NodeId>> {
    let node = graph.node(id)?;
    let op = node.op().clone();
    let children = node.children().to_vec();

    match op {
        Op::BoolNot => {
            let inner = children[0];
            if let Some(value) = constant(graph, inner)? {
                return Ok(Some(graph.add(Op::ConstantBool(!value), [])?));
            }
            if matches!(graph.op(inner)?, Op::BoolNot) {
                return Ok(Some(graph.children(inner)?[0]));
            }
            Ok(None)
        }
        Op::BoolAnd | Op::BoolOr => {
            // The absorbing element decides the result; the identity element drops out.
            let absorbing = matches!(op, Op::BoolOr);
            let (lhs, rhs) = (children[0], children[1]);
            if lhs == rhs {
                return Ok(Some(lhs));
            }
            match (constant(graph, lhs)?, constant(graph, rhs)?) {
                (Some(v), _) if v == absorbing => Ok(Some(lhs)),
                (_, Some(v)) if v == absorbing => Ok(Some(rhs)),
                (Some(_), _) => Ok(Some(rhs)),
                (_, Some(_)) => Ok(Some(lhs)),
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}
