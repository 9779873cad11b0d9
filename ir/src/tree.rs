//! Tree visualization for op graphs.
//!
//! A graph is a DAG, so a shared node would be printed once per parent. The
//! compact renderer prints each node once and shows `[id] → (see above)` for
//! later occurrences.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use ptree::{Style, TreeItem};

use crate::graph::{Graph, NodeId};

#[derive(Clone)]
struct CompactTree<'g> {
    graph: &'g Graph,
    id: NodeId,
    visited: Rc<RefCell<HashSet<NodeId>>>,
    is_backref: RefCell<bool>,
}

impl<'g> CompactTree<'g> {
    fn new(graph: &'g Graph, id: NodeId, visited: Rc<RefCell<HashSet<NodeId>>>) -> Self {
        Self { graph, id, visited, is_backref: RefCell::new(false) }
    }
}

impl TreeItem for CompactTree<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        let mut visited = self.visited.borrow_mut();
        if !visited.insert(self.id) {
            *self.is_backref.borrow_mut() = true;
            return write!(f, "[{}] → (see above)", self.id);
        }
        match self.graph.get(self.id) {
            Some(node) => write!(f, "[{}] {} : {}", self.id, node.op().describe(), node.op().category()),
            None => write!(f, "[{}] <dead>", self.id),
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        if *self.is_backref.borrow() {
            return Cow::Borrowed(&[]);
        }
        let children = self.graph.get(self.id).map(|n| n.children()).unwrap_or_default();
        Cow::Owned(children.iter().map(|&c| Self::new(self.graph, c, self.visited.clone())).collect())
    }
}

/// Render the subgraph below `root` as an ASCII tree with back-references for shared nodes.
pub fn render_tree_compact(graph: &Graph, root: NodeId) -> String {
    let tree = CompactTree::new(graph, root, Rc::default());
    let mut buf = Vec::new();
    match ptree::write_tree(&tree, &mut buf) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(err) => format!("<tree rendering failed: {err}>"),
    }
}
