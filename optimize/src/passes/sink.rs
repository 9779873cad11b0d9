//! Push per-image operations below image conditionals.
//!
//! `PixelFormat(f, Conditional(c, a, b))` becomes
//! `Conditional(c, PixelFormat(f, a), PixelFormat(f, b))`, and likewise for
//! mipmapping. With the operation moved into the branches, the semantic
//! pass and folding can work on each branch on its own.

use tessera_ir::{Graph, NodeId, Op, rewrite_bottom_up};
use tessera_value::Category;

use super::{Pass, PassContext};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct SinkPass;

impl Pass for SinkPass {
    fn name(&self) -> &'static str {
        "sink"
    }

    #[tracing::instrument(skip_all, fields(pass = %ctx.pass))]
    fn run(&self, graph: &mut Graph, ctx: &PassContext<'_>) -> Result<bool> {
        let changed = rewrite_bottom_up(graph, sink)?;
        tracing::debug!(changed, "sink pass");
        Ok(changed)
    }
}

fn sink(graph: &mut Graph, id: NodeId) -> tessera_ir::Result<Option<NodeId>> {
    let node = graph.node(id)?;
    let op = node.op().clone();
    if !matches!(op, Op::ImagePixelFormat { .. } | Op::ImageMipmap { .. }) {
        return Ok(None);
    }

    let conditional = node.children()[0];
    if graph.op(conditional)? != &(Op::Conditional { category: Category::Image }) {
        return Ok(None);
    }
    let &[cond, yes, no] = graph.children(conditional)? else {
        return Ok(None);
    };

    let yes = graph.add(op.clone(), [yes])?;
    let no = graph.add(op, [no])?;
    tracing::trace!(node = %id, "sunk below conditional");
    Ok(Some(graph.add(Op::Conditional { category: Category::Image }, [cond, yes, no])?))
}
