//! Semantic simplifications that need no size or value information.
//!
//! - `Conditional(const, a, b)` selects its branch.
//! - `Conditional(c, a, a)` is `a`.
//! - `PixelFormat(f, PixelFormat(g, x))` is `PixelFormat(f, x)`.
//! - `Resize(s, Resize(t, x))` is `Resize(s, x)`.
//! - `Morph(base, target, 0.0)` is `base`.

use tessera_ir::{Graph, NodeId, Op, rewrite_bottom_up};

use super::{Pass, PassContext};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticPass;

impl Pass for SemanticPass {
    fn name(&self) -> &'static str {
        "semantic"
    }

    #[tracing::instrument(skip_all, fields(pass = %ctx.pass))]
    fn run(&self, graph: &mut Graph, ctx: &PassContext<'_>) -> Result<bool> {
        let changed = rewrite_bottom_up(graph, simplify)?;
        tracing::debug!(changed, "semantic pass");
        Ok(changed)
    }
}

fn simplify(graph: &mut Graph, id: NodeId) -> tessera_ir::Result<Option<NodeId>> {
    let node = graph.node(id)?;
    let children = node.children();
    match node.op() {
        Op::Conditional { .. } => {
            let (cond, yes, no) = (children[0], children[1], children[2]);
            if let Op::ConstantBool(value) = graph.op(cond)? {
                return Ok(Some(if *value { yes } else { no }));
            }
            Ok((yes == no).then_some(yes))
        }
        Op::ImagePixelFormat { format } => {
            let format = *format;
            let inner = children[0];
            match graph.op(inner)? {
                Op::ImagePixelFormat { .. } => {
                    let source = graph.children(inner)?[0];
                    Ok(Some(graph.add(Op::ImagePixelFormat { format }, [source])?))
                }
                _ => Ok(None),
            }
        }
        Op::ImageResize { size } => {
            let size = *size;
            let inner = children[0];
            match graph.op(inner)? {
                Op::ImageResize { .. } => {
                    let source = graph.children(inner)?[0];
                    Ok(Some(graph.add(Op::ImageResize { size }, [source])?))
                }
                _ => Ok(None),
            }
        }
        Op::MeshMorph => {
            let (base, factor) = (children[0], children[2]);
            match graph.op(factor)? {
                Op::ConstantScalar(s) if s.0 == 0.0 => Ok(Some(base)),
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}
