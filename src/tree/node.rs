//! Call tree node.

use crate::parser::{Polarity, StackFrame};

/// Index of a node inside its [`CallTree`](super::CallTree) arena.
///
/// After construction the arena is in depth-first pre-order, so a `NodeId`
/// is also the node's row number in the flat view.
pub type NodeId = usize;

/// The root is always row 0
pub const ROOT: NodeId = 0;

/// Label shown for the synthetic root
pub const ROOT_LABEL: &str = "[Root]";

/// One call frame shared by every capture whose stack passes through it
#[derive(Debug, Clone, Default)]
pub struct CallTreeNode {
    pub module: String,
    pub function: String,
    pub offset: String,

    /// `module!function+offset [source]`
    pub label: String,

    /// `label` lowercased once, for pattern matching
    label_lower: String,

    /// Annotation. Seeded from the frame's `//` comment, then edited by matches and users.
    pub tag: String,

    /// Sum of the leaf deltas below this node (+1 per AddRef, -1 per Release)
    pub ref_count_delta: i64,

    /// Reference count of the capture ending here, or of the first child's for inner nodes
    pub captured_ref_count: i64,

    /// Time-travel position of the capture ending here, or of the first child's
    pub position: String,

    /// True when exactly one reference-count event lies below this node
    pub is_leaf: bool,

    /// True when this node's tag, or all of its children, account for everything below it
    pub fully_attributed: bool,

    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,

    /// Set on the node where a capture terminated
    pub(crate) polarity: Option<Polarity>,
}

impl CallTreeNode {
    pub(crate) fn root() -> Self {
        Self {
            label: ROOT_LABEL.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn from_frame(frame: &StackFrame, parent: NodeId) -> Self {
        let label = frame.display_label();
        Self {
            module: frame.module.clone(),
            function: frame.function.clone(),
            offset: frame.offset.clone(),
            label_lower: label.to_lowercase(),
            label,
            tag: frame.tag.clone(),
            parent: Some(parent),
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_attributed(&self) -> bool {
        !self.tag.is_empty()
    }

    /// Whether this node was created for `frame` (merge identity)
    pub(crate) fn same_frame(&self, frame: &StackFrame) -> bool {
        self.module == frame.module
            && self.function == frame.function
            && self.offset == frame.offset
            && self.tag == frame.tag
    }

    pub fn module_and_function(&self) -> String {
        if self.module.is_empty() {
            self.function.clone()
        } else {
            format!("{}!{}", self.module, self.function)
        }
    }

    pub fn module_function_and_offset(&self) -> String {
        format!("{}{}", self.module_and_function(), self.offset)
    }

    /// Whether a heuristic frame pattern may land on this node
    ///
    /// The root never matches and attributed nodes never match. `pattern` must
    /// already be lowercase; it is searched for as a substring of the label.
    pub fn matches_pattern(&self, pattern: &str, must_be_leaf: bool) -> bool {
        !self.is_root()
            && (!must_be_leaf || self.is_leaf)
            && !self.is_attributed()
            && self.label_lower.contains(pattern)
    }
}
