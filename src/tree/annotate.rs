//! Annotations and their upward propagation.
//!
//! A node is *fully attributed* when its own tag explains it, or when every
//! child is fully attributed. In the second case the node receives the
//! synthetic [`ALL_CHILDREN_ACCOUNTED_FOR`] tag, which is retracted again
//! as soon as one child loses its attribution.

use super::node::NodeId;
use super::CallTree;
use crate::utils::config::ALL_CHILDREN_ACCOUNTED_FOR;
use log::debug;

impl CallTree {
    /// Set a node's tag
    ///
    /// Does not propagate; call [`CallTree::propagate_up`] afterwards.
    pub fn attribute(&mut self, id: NodeId, tag: impl Into<String>) {
        self.node_mut(id).tag = tag.into();
    }

    /// Clear a node's tag
    pub fn unattribute(&mut self, id: NodeId) {
        self.node_mut(id).tag.clear();
    }

    /// Recompute attribution for `id` and carry changes towards the root
    ///
    /// The walk stops at the first ancestor whose status did not change.
    pub fn propagate_up(&mut self, id: NodeId) {
        self.refresh_attribution(id);

        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if !self.refresh_attribution(parent) {
                break;
            }
            current = parent;
        }
    }

    /// Recompute attribution for the whole tree, children before parents
    pub fn propagate_all(&mut self) {
        // Pre-order arena: every child sits after its parent
        for id in (0..self.len()).rev() {
            self.refresh_attribution(id);
        }
    }

    /// Drop every tag and attribution flag
    pub fn clear_annotations(&mut self) {
        for id in 0..self.len() {
            let node = self.node_mut(id);
            node.tag.clear();
            node.fully_attributed = false;
        }
        debug!("Cleared annotations on {} rows", self.len());
    }

    /// **Private** - update one node's flag and synthetic tag
    ///
    /// # Returns
    /// Whether the fully-attributed flag changed
    fn refresh_attribution(&mut self, id: NodeId) -> bool {
        let node = self.node(id);
        let own_tag = node.is_attributed() && node.tag != ALL_CHILDREN_ACCOUNTED_FOR;
        let children_done = !node.children.is_empty()
            && node.children.iter().all(|&c| self.node(c).fully_attributed);
        let status = own_tag || children_done;

        let node = self.node_mut(id);
        let changed = node.fully_attributed != status;
        node.fully_attributed = status;

        if status && node.tag.is_empty() {
            node.tag = ALL_CHILDREN_ACCOUNTED_FOR.to_string();
        } else if !status && node.tag == ALL_CHILDREN_ACCOUNTED_FOR {
            node.tag.clear();
        }

        changed
    }
}
