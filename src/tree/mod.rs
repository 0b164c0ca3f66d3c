//! Stitched call tree.
//!
//! All captures of a trace are merged into one tree keyed by call frame:
//! - the root stands for "no frame"
//! - each level below it is one frame further towards the reference-count call
//! - a leaf is the call that changed the reference count
//!
//! Nodes live in an arena (`Vec<CallTreeNode>`) and refer to each other by
//! [`NodeId`]. Once built, the arena is in depth-first pre-order, so node ids
//! double as the row numbers used by line-number rules and by the renderer.

pub mod annotate;
pub mod node;
pub mod search;
pub mod stats;
pub mod stitch;

pub use node::{CallTreeNode, NodeId, ROOT, ROOT_LABEL};
pub use stats::TreeStats;

/// Arena-backed call tree
#[derive(Debug, Clone)]
pub struct CallTree {
    nodes: Vec<CallTreeNode>,
    dropped_captures: usize,
}

impl Default for CallTree {
    fn default() -> Self {
        Self {
            nodes: vec![CallTreeNode::root()],
            dropped_captures: 0,
        }
    }
}

impl CallTree {
    /// Tree holding only the root
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &CallTreeNode {
        &self.nodes[ROOT]
    }

    /// Node by id. Panics on an id that does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &CallTreeNode {
        &self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&CallTreeNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut CallTreeNode {
        &mut self.nodes[id]
    }

    /// Flat pre-order row list, root first
    pub fn rows(&self) -> &[CallTreeNode] {
        &self.nodes
    }

    /// Number of rows, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no capture made it into the tree
    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Captures rejected while stitching
    pub fn dropped_captures(&self) -> usize {
        self.dropped_captures
    }

    /// First row after the subtree rooted at `id`
    pub fn subtree_end(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(&last) = self.nodes[current].children.last() {
            current = last;
        }
        current + 1
    }

    /// Ancestors of `id`, nearest first, root last
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id].parent, move |&p| self.nodes[p].parent)
    }

    /// Depth of a node (root = 0)
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }
}
