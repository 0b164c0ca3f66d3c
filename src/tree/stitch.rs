//! Stitching captures into a call tree.
//!
//! Steps:
//! 1. Merge every capture from its outermost frame inwards
//! 2. Compute net reference-count deltas and leaf status
//! 3. Trim the shared single-path prefix at the top
//! 4. Collapse known wrapper AddRef/Release calls at the bottom
//! 5. Renumber the arena in pre-order

use super::node::{CallTreeNode, NodeId, ROOT};
use super::CallTree;
use crate::parser::{Polarity, RefCountStack};
use crate::utils::config::AnalysisConfig;
use log::{debug, info, warn};

impl CallTree {
    /// Build a call tree from parsed captures
    ///
    /// **Public** - main entry point for tree construction
    ///
    /// # Arguments
    /// * `captures` - Captures in trace order
    /// * `config` - Analysis settings (bottom trim markers)
    ///
    /// # Returns
    /// The stitched tree. Captures that would break the one-capture-per-leaf
    /// invariant are dropped and counted in [`CallTree::dropped_captures`].
    pub fn stitch(captures: &[RefCountStack], config: &AnalysisConfig) -> Self {
        let mut tree = CallTree::new();

        for (index, capture) in captures.iter().enumerate() {
            if !tree.merge_capture(capture) {
                warn!("Capture #{} dropped: it does not end on a fresh leaf", index + 1);
                tree.dropped_captures += 1;
            }
        }

        if tree.is_empty() {
            info!("No captures to stitch");
            return tree;
        }

        tree.update_ref_count_diff(ROOT);
        tree.trim_top();
        if config.trim_bottom {
            tree.trim_bottom(ROOT, config);
        }
        tree.compact();

        info!(
            "Stitched {} captures into {} rows (net delta {})",
            captures.len() - tree.dropped_captures,
            tree.len(),
            tree.root().ref_count_delta
        );
        tree
    }

    /// Merge one capture, outermost frame first
    ///
    /// **Private** - only the most recently added child at each level is
    /// considered for sharing, so shared prefixes must be adjacent in the input.
    ///
    /// # Returns
    /// `false` if the capture was rejected. The tree is left untouched in that case.
    fn merge_capture(&mut self, capture: &RefCountStack) -> bool {
        if capture.is_empty() {
            return false;
        }

        let mut current = ROOT;
        let mut level = 1;

        // Walk the part of the path that already exists
        while let Some(frame) = capture.frame_from_top(level) {
            if self.nodes[current].polarity.is_some() {
                // Another capture already ends here; nothing may hang below it
                return false;
            }
            match self.nodes[current].children.last() {
                Some(&last) if self.nodes[last].same_frame(frame) => {
                    current = last;
                    level += 1;
                }
                _ => break,
            }
        }

        if self.nodes[current].polarity.is_some() {
            return false;
        }

        let exhausted = capture.frame_from_top(level).is_none();
        if exhausted && !self.nodes[current].children.is_empty() {
            // Capture ends on a node other captures pass through
            return false;
        }

        while let Some(frame) = capture.frame_from_top(level) {
            let id = self.nodes.len();
            self.nodes.push(CallTreeNode::from_frame(frame, current));
            self.nodes[current].children.push(id);
            current = id;
            level += 1;
        }

        let polarity = match capture.polarity() {
            Polarity::Unknown => {
                warn!(
                    "Capture at position '{}' has unknown polarity, counted as Release",
                    capture.position
                );
                Polarity::Release
            }
            known => known,
        };

        let leaf = &mut self.nodes[current];
        leaf.polarity = Some(polarity);
        leaf.captured_ref_count = capture.ref_count;
        leaf.position = capture.position.clone();
        true
    }

    /// Compute deltas, leaf status and inherited capture data bottom-up
    fn update_ref_count_diff(&mut self, id: NodeId) {
        let children = self.nodes[id].children.clone();

        if children.is_empty() {
            let node = &mut self.nodes[id];
            match node.polarity {
                Some(polarity) => {
                    node.ref_count_delta = polarity.delta();
                    node.is_leaf = true;
                }
                None => {
                    node.ref_count_delta = 0;
                    node.is_leaf = false;
                }
            }
            return;
        }

        let mut delta = 0;
        for &child in &children {
            self.update_ref_count_diff(child);
            delta += self.nodes[child].ref_count_delta;
        }

        let first = &self.nodes[children[0]];
        let is_leaf = children.len() == 1 && first.is_leaf;
        let captured_ref_count = first.captured_ref_count;
        let position = first.position.clone();

        let node = &mut self.nodes[id];
        node.ref_count_delta = delta;
        node.is_leaf = is_leaf;
        node.captured_ref_count = captured_ref_count;
        node.position = position;
    }

    /// Splice away the single-path prefix under the root
    ///
    /// Stops before removing the last inner node, so a tree built from a
    /// single capture keeps its leaf. Running it again is a no-op.
    pub(crate) fn trim_top(&mut self) {
        loop {
            let child = match self.nodes[ROOT].children.as_slice() {
                [only] => *only,
                _ => break,
            };
            if self.nodes[child].children.is_empty() {
                break;
            }

            let grandchildren = std::mem::take(&mut self.nodes[child].children);
            for &grandchild in &grandchildren {
                self.nodes[grandchild].parent = Some(ROOT);
            }
            self.nodes[child].parent = None;
            debug!("Trimmed top frame: {}", self.nodes[child].label);
            self.nodes[ROOT].children = grandchildren;
        }
    }

    /// Collapse wrapper AddRef/Release calls into their own leaf
    ///
    /// A single-event node whose label carries the configured wrapper marker
    /// keeps the capture data of the chain below it and drops that chain.
    fn trim_bottom(&mut self, id: NodeId, config: &AnalysisConfig) {
        let node = &self.nodes[id];
        let is_wrapper = !node.children.is_empty()
            && node.is_leaf
            && ((node.ref_count_delta == 1 && node.label.contains(&config.addref_wrapper_marker))
                || (node.ref_count_delta == -1 && node.label.contains(&config.release_wrapper_marker)));

        if is_wrapper {
            let first = self.nodes[id].children[0];
            let captured_ref_count = self.nodes[first].captured_ref_count;
            let position = self.nodes[first].position.clone();
            let polarity = if self.nodes[id].ref_count_delta == 1 {
                Polarity::AddRef
            } else {
                Polarity::Release
            };

            let node = &mut self.nodes[id];
            node.captured_ref_count = captured_ref_count;
            node.position = position;
            node.polarity = Some(polarity);
            node.children.clear();
            return;
        }

        let children = self.nodes[id].children.clone();
        for child in children {
            self.trim_bottom(child, config);
        }
    }

    /// Renumber reachable nodes in pre-order and drop the detached ones
    fn compact(&mut self) {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }

        let mut remap = vec![usize::MAX; self.nodes.len()];
        for (new_id, &old_id) in order.iter().enumerate() {
            remap[old_id] = new_id;
        }

        let mut old_nodes = std::mem::take(&mut self.nodes);
        self.nodes = order
            .iter()
            .map(|&old_id| {
                let mut node = std::mem::take(&mut old_nodes[old_id]);
                node.parent = node.parent.map(|p| remap[p]);
                for child in node.children.iter_mut() {
                    *child = remap[*child];
                }
                node
            })
            .collect();

        debug!(
            "Compacted tree: {} rows kept, {} detached",
            self.nodes.len(),
            old_nodes.len() - self.nodes.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_trace;
    use pretty_assertions::assert_eq;

    fn stitch(raw: &str) -> CallTree {
        let config = AnalysisConfig::default();
        CallTree::stitch(&parse_trace(raw, &config), &config)
    }

    fn labels(tree: &CallTree) -> Vec<String> {
        tree.rows().iter().map(|n| n.label.clone()).collect()
    }

    #[test]
    fn test_empty_trace() {
        let tree = stitch("");
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().ref_count_delta, 0);
    }

    #[test]
    fn test_single_capture_keeps_leaf() {
        let tree = stitch(
            "ref count is 1\nStack begin\napp!Foo::AddRef+0x1\napp!Bar+0x2\napp!main+0x3\nStack end\n",
        );

        // Prefix trimmed down to the last inner node
        assert_eq!(labels(&tree), vec!["[Root]", "app!Foo::AddRef+0x1"]);
        assert!(tree.node(1).is_leaf);
        assert_eq!(tree.node(1).ref_count_delta, 1);
        assert_eq!(tree.root().ref_count_delta, 1);
    }

    #[test]
    fn test_duplicate_capture_is_dropped() {
        let block = "ref count is 1\nStack begin\napp!Foo::AddRef+0x1\napp!main+0x3\nStack end\n";
        let tree = stitch(&format!("{block}{block}"));

        assert_eq!(tree.dropped_captures(), 1);
        assert_eq!(tree.root().ref_count_delta, 1);
    }

    #[test]
    fn test_capture_ending_on_inner_node_is_dropped() {
        let raw = "\
ref count is 1
Stack begin
app!Foo::AddRef+0x1
app!Caller+0x2
app!main+0x3
Stack end
ref count is 0
Stack begin
app!Caller+0x2
app!main+0x3
Stack end
";
        let tree = stitch(raw);
        assert_eq!(tree.dropped_captures(), 1);
    }

    #[test]
    fn test_unknown_polarity_counts_as_release() {
        let raw = "\
ref count is 1
Stack begin
app!Foo::AddRef+0x1
app!main+0x3
Stack end
ref count is 0
Stack begin
app!Mystery+0x1
app!main+0x3
Stack end
";
        let tree = stitch(raw);
        assert_eq!(tree.root().ref_count_delta, 0);
    }

    #[test]
    fn test_trim_bottom_collapses_wrapper() {
        let raw = "\
ref count is 2
Time Travel Position: 5:1
Stack begin
app!xref::optional_ref_count::AddRef+0x9
app!CDependencyObject::AddRef+0x12
app!Holder::Take+0x4
app!main+0x3
Stack end
ref count is 1
Time Travel Position: 6:1
Stack begin
app!xref::optional_ref_count::Release+0x9
app!CDependencyObject::Release+0x12
app!Holder::Drop+0x4
app!main+0x3
Stack end
";
        let tree = stitch(raw);
        assert_eq!(
            labels(&tree),
            vec![
                "[Root]",
                "app!Holder::Take+0x4",
                "app!CDependencyObject::AddRef+0x12",
                "app!Holder::Drop+0x4",
                "app!CDependencyObject::Release+0x12",
            ]
        );
        assert!(tree.node(2).children.is_empty());
        assert_eq!(tree.node(2).position, "5:1");
        assert_eq!(tree.node(2).captured_ref_count, 2);
        assert_eq!(tree.node(4).ref_count_delta, -1);
        assert_eq!(tree.node(4).position, "6:1");
    }

    #[test]
    fn test_trim_bottom_can_be_disabled() {
        let raw = "\
ref count is 2
Stack begin
app!xref::AddRef+0x9
app!CDependencyObject::AddRef+0x12
app!Holder::Take+0x4
app!main+0x3
Stack end
ref count is 1
Stack begin
app!Other::Release+0x9
app!main+0x3
Stack end
";
        let config = AnalysisConfig {
            trim_bottom: false,
            ..Default::default()
        };
        let tree = CallTree::stitch(&parse_trace(raw, &config), &config);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.node(3).label, "app!xref::AddRef+0x9");
        assert_eq!(tree.node(4).label, "app!Other::Release+0x9");
    }

    #[test]
    fn test_rows_are_preorder() {
        let raw = "\
ref count is 1
Stack begin
app!A::AddRef+0x1
app!Shared+0x1
app!main+0x1
Stack end
ref count is 2
Stack begin
app!B::AddRef+0x1
app!Shared+0x1
app!main+0x1
Stack end
ref count is 1
Stack begin
app!C::Release+0x1
app!main+0x1
Stack end
";
        let tree = stitch(raw);
        for (id, node) in tree.rows().iter().enumerate() {
            for &child in &node.children {
                assert!(child > id);
                assert_eq!(tree.parent(child), Some(id));
            }
        }
        assert_eq!(tree.subtree_end(0), tree.len());
        assert_eq!(tree.node(1).label, "app!Shared+0x1");
        assert_eq!(tree.subtree_end(1), 4);
    }

    #[test]
    fn test_trim_top_is_idempotent() {
        let raw = "\
ref count is 1
Stack begin
app!A::AddRef+0x1
app!Shared+0x1
app!Outer+0x1
app!main+0x1
Stack end
ref count is 0
Stack begin
app!A::Release+0x1
app!Shared+0x1
app!Outer+0x1
app!main+0x1
Stack end
";
        let mut tree = stitch(raw);
        let once = labels(&tree);
        assert_eq!(once, vec!["[Root]", "app!A::AddRef+0x1", "app!A::Release+0x1"]);

        tree.trim_top();
        tree.compact();
        assert_eq!(labels(&tree), once);
    }
}
