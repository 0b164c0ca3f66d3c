//! Attribution statistics over the leaves of a call tree.

use super::node::ROOT;
use super::CallTree;
use log::debug;
use serde::{Deserialize, Serialize};

/// Leaf counts split by polarity and attribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub unattributed_addref: usize,
    pub unattributed_release: usize,
    pub attributed_addref: usize,
    pub attributed_release: usize,
}

impl TreeStats {
    pub fn total_addref(&self) -> usize {
        self.unattributed_addref + self.attributed_addref
    }

    pub fn total_release(&self) -> usize {
        self.unattributed_release + self.attributed_release
    }

    /// AddRefs not balanced by any Release
    pub fn net(&self) -> i64 {
        self.total_addref() as i64 - self.total_release() as i64
    }

    /// Format as a one-line summary string
    pub fn summary(&self) -> String {
        format!(
            "Unattributed AddRef: {}, Unattributed Release: {}, Attributed AddRef: {}, Attributed Release: {}",
            self.unattributed_addref,
            self.unattributed_release,
            self.attributed_addref,
            self.attributed_release
        )
    }
}

impl CallTree {
    /// Count leaves by polarity and attribution
    ///
    /// **Public** - a leaf is attributed when it or any ancestor carries a tag
    pub fn statistics(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut stack = vec![(ROOT, false)];

        while let Some((id, inherited)) = stack.pop() {
            let node = self.node(id);
            let attributed = inherited || node.is_attributed();

            if !node.children.is_empty() {
                stack.extend(node.children.iter().map(|&c| (c, attributed)));
                continue;
            }

            match (node.ref_count_delta, attributed) {
                (1, true) => stats.attributed_addref += 1,
                (1, false) => stats.unattributed_addref += 1,
                (-1, true) => stats.attributed_release += 1,
                (-1, false) => stats.unattributed_release += 1,
                (delta, _) => debug!("Row {} has delta {}, not counted", id, delta),
            }
        }

        stats
    }
}
