//! Static image size propagation.
//!
//! Sizes are inferred bottom-up from constants, plain-colour images and
//! explicit resizes. Once a size is known:
//!
//! - `ResizeLike(x, like)` becomes `Resize(size_of(like), x)`.
//! - `Resize(s, x)` where `x` already has size `s` is `x`.
//!
//! The same inference feeds the "proven small" check of the folding
//! scheduler.

use std::collections::HashMap;

use tessera_ir::{Graph, NodeId, Op, rewrite_bottom_up, toposort};
use tessera_value::{Category, ImageSize};

use super::{Pass, PassContext};
use crate::error::Result;

/// Known output sizes of image nodes.
pub type SizeMap = HashMap<NodeId, ImageSize>;

/// Size of `id` given the sizes of its children. Never loads a payload.
pub fn infer_size(graph: &Graph, sizes: &SizeMap, id: NodeId) -> tessera_ir::Result<Option<ImageSize>> {
    let node = graph.node(id)?;
    let child = |index: usize| node.child(index).and_then(|c| sizes.get(&c).copied());
    Ok(match node.op() {
        Op::ConstantImage { image, .. } => image.peek().map(|i| i.size),
        Op::ImagePlainColor { size, .. } | Op::ImageResize { size } => Some(*size),
        Op::ImageResizeLike => child(1),
        Op::ImagePixelFormat { .. } | Op::ImageMipmap { .. } | Op::ImageLayer { .. } | Op::ImageMultiLayer { .. } => {
            child(0)
        }
        Op::ImageCompose { .. } => child(1),
        Op::Conditional { category: Category::Image } => child(1).filter(|yes| child(2) == Some(*yes)),
        _ => None,
    })
}

/// Sizes of every image node reachable from the roots.
pub fn infer_sizes(graph: &Graph) -> tessera_ir::Result<SizeMap> {
    let mut sizes = SizeMap::new();
    for id in toposort(graph, &graph.root_nodes()).order {
        if let Some(size) = infer_size(graph, &sizes, id)? {
            sizes.insert(id, size);
        }
    }
    Ok(sizes)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SizePass;

impl Pass for SizePass {
    fn name(&self) -> &'static str {
        "size"
    }

    #[tracing::instrument(skip_all, fields(pass = %ctx.pass))]
    fn run(&self, graph: &mut Graph, ctx: &PassContext<'_>) -> Result<bool> {
        let mut sizes = SizeMap::new();
        let changed = rewrite_bottom_up(graph, |graph, id| {
            let replacement = resolve(graph, &sizes, id)?;
            let result = replacement.unwrap_or(id);
            if !sizes.contains_key(&result)
                && let Some(size) = infer_size(graph, &sizes, result)?
            {
                sizes.insert(result, size);
            }
            if result != id
                && let Some(&size) = sizes.get(&result)
            {
                sizes.insert(id, size);
            }
            Ok(replacement)
        })?;
        tracing::debug!(changed, known = sizes.len(), "size pass");
        Ok(changed)
    }
}

fn resolve(graph: &mut Graph, sizes: &SizeMap, id: NodeId) -> tessera_ir::Result<Option<NodeId>> {
    let node = graph.node(id)?;
    match node.op() {
        Op::ImageResizeLike => {
            let (source, like) = (node.children()[0], node.children()[1]);
            match sizes.get(&like) {
                Some(&size) => Ok(Some(graph.add(Op::ImageResize { size }, [source])?)),
                None => Ok(None),
            }
        }
        Op::ImageResize { size } => {
            let source = node.children()[0];
            Ok((sizes.get(&source) == Some(size)).then_some(source))
        }
        _ => Ok(None),
    }
}
