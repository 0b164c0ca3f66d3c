//! Row navigation helpers: text search, match-partner lookup and the unattributed view.

use super::node::NodeId;
use super::CallTree;

const ADDREF_TAG_PREFIX: &str = "[AddRef";
const RELEASE_TAG_PREFIX: &str = "[Release";

impl CallTree {
    /// Next row after `from` whose label or tag contains `text` (case-insensitive)
    pub fn find_next(&self, from: NodeId, text: &str) -> Option<NodeId> {
        let needle = text.to_lowercase();
        (from + 1..self.len()).find(|&id| {
            let node = self.node(id);
            node.label.to_lowercase().contains(&needle)
                || (node.is_attributed() && node.tag.to_lowercase().contains(&needle))
        })
    }

    /// Row carrying the other half of a heuristic match
    ///
    /// From an `[AddRef for X: match #n]` row, searches forward for the
    /// matching `[Release for X: match #n]` row; from a Release row, searches backward.
    pub fn find_partner(&self, id: NodeId) -> Option<NodeId> {
        let tag = &self.get(id)?.tag;

        if tag.starts_with(ADDREF_TAG_PREFIX) {
            let partner = tag.replacen(ADDREF_TAG_PREFIX, RELEASE_TAG_PREFIX, 1);
            (id + 1..self.len()).find(|&row| self.node(row).tag == partner)
        } else if tag.starts_with(RELEASE_TAG_PREFIX) {
            let partner = tag.replacen(RELEASE_TAG_PREFIX, ADDREF_TAG_PREFIX, 1);
            (0..id).rev().find(|&row| self.node(row).tag == partner)
        } else {
            None
        }
    }

    /// Rows still needing an explanation
    ///
    /// A row is listed when neither it nor any ancestor carries a tag.
    /// The root is never listed.
    pub fn unattributed_rows(&self) -> Vec<NodeId> {
        let mut rows = Vec::new();
        let mut id = 1;
        while id < self.len() {
            if self.node(id).is_attributed() {
                // Skip the whole explained subtree
                id = self.subtree_end(id);
            } else {
                rows.push(id);
                id += 1;
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_trace;
    use crate::utils::config::AnalysisConfig;
    use pretty_assertions::assert_eq;

    // Rows: 0 root, 1 Left, 2 A::AddRef, 3 B::Release, 4 C::Release
    fn tree() -> CallTree {
        let raw = "\
ref count is 1
Stack begin
app!A::AddRef+0x1
app!Left+0x1
app!main+0x1
Stack end
ref count is 0
Stack begin
app!B::Release+0x1
app!Left+0x1
app!main+0x1
Stack end
ref count is 1
Stack begin
app!C::Release+0x1
app!main+0x1
Stack end
";
        let config = AnalysisConfig::default();
        CallTree::stitch(&parse_trace(raw, &config), &config)
    }

    #[test]
    fn test_find_next_label_and_tag() {
        let mut tree = tree();
        assert_eq!(tree.find_next(0, "release"), Some(3));
        assert_eq!(tree.find_next(3, "release"), Some(4));
        assert_eq!(tree.find_next(4, "release"), None);

        tree.attribute(2, "Cached in the layout manager");
        assert_eq!(tree.find_next(0, "LAYOUT"), Some(2));
    }

    #[test]
    fn test_find_partner_both_directions() {
        let mut tree = tree();
        tree.attribute(2, "[AddRef for Cache: match #1]");
        tree.attribute(4, "[Release for Cache: match #1]");
        tree.attribute(3, "[Release for Cache: match #2]");

        assert_eq!(tree.find_partner(2), Some(4));
        assert_eq!(tree.find_partner(4), Some(2));
        assert_eq!(tree.find_partner(3), None);
        assert_eq!(tree.find_partner(1), None);
    }

    #[test]
    fn test_unattributed_rows_skip_tagged_subtrees() {
        let mut tree = tree();
        assert_eq!(tree.unattributed_rows(), vec![1, 2, 3, 4]);

        tree.attribute(1, "explained");
        assert_eq!(tree.unattributed_rows(), vec![4]);
    }
}
