//! Chain matching against the call tree.
//!
//! Finding one AddRef/Release pair:
//! 1. Scan rows forward for an unattributed +1 leaf matching the AddRef chain's
//!    last frame, then check the outer frames on its ancestors
//! 2. Find the Release according to the scope:
//!    - none: same upward check on -1 leaves, scanning on from the AddRef
//!    - named: walk down the siblings that follow the AddRef's topmost frame
//!    - wildcard: as named, one level higher, anchored on the AddRef's caller
//! 3. Keep the Release alternative that lands on the earliest row
//!
//! Every search returns the matched path (outermost first) so that a failed
//! branch can be dropped and the next candidate tried.

use super::pattern::{FramePattern, PatternHeuristic, Scope};
use crate::tree::{CallTree, NodeId};
use log::debug;
use std::collections::HashSet;

const ADDREF_DELTA: i64 = 1;
const RELEASE_DELTA: i64 = -1;

/// Outcome of one search step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// AddRef path, outermost first, leaf last
    pub addref: Vec<NodeId>,

    /// Release path, or `None` when the AddRef has no partner
    pub release: Option<Vec<NodeId>>,
}

impl MatchResult {
    pub fn addref_leaf(&self) -> NodeId {
        // Paths are never empty
        self.addref[self.addref.len() - 1]
    }

    pub fn release_leaf(&self) -> Option<NodeId> {
        self.release.as_ref().and_then(|path| path.last().copied())
    }
}

/// Find the next AddRef match at or after `start`, with its Release if any
///
/// **Public** - one step of the apply loop
///
/// # Returns
/// `None` when no further AddRef matches. `Some` with `release: None` when an
/// AddRef matched but nothing pairs with it; the caller resumes after that AddRef.
pub fn find_match(tree: &CallTree, heuristic: &PatternHeuristic, start: NodeId) -> Option<MatchResult> {
    let addref = find_unattributed_match(tree, start, heuristic.addref_chain(), ADDREF_DELTA)?;
    let top = addref[0];
    let leaf = addref[addref.len() - 1];

    let candidates = heuristic.release_chains().iter().filter_map(|chain| match heuristic.scope {
        Scope::None => find_unattributed_match(tree, leaf, chain, RELEASE_DELTA),
        Scope::Named(_) => find_release_in_scope(tree, top, chain),
        Scope::Wildcard => {
            let wildcard = tree.parent(top).filter(|&p| !tree.node(p).is_root())?;
            let mut scoped = Vec::with_capacity(chain.len() + 1);
            scoped.push(FramePattern::new(tree.node(wildcard).module_and_function(), true));
            scoped.extend(chain.iter().cloned());
            find_release_in_scope(tree, wildcard, &scoped)
        }
    });

    let release = candidates.min_by_key(|path| path[path.len() - 1]);

    debug!(
        "AddRef match at row {} (release: {:?})",
        leaf,
        release.as_ref().and_then(|p| p.last())
    );
    Some(MatchResult { addref, release })
}

/// Scan rows forward for a leaf matching the chain, checking ancestors upward
///
/// **Public** - the unscoped search used for both polarities
///
/// # Arguments
/// * `start` - First row to consider
/// * `chain` - Frames, outermost first
/// * `delta` - Required net delta of the leaf (+1 AddRef, -1 Release)
pub fn find_unattributed_match(
    tree: &CallTree,
    start: NodeId,
    chain: &[FramePattern],
    delta: i64,
) -> Option<Vec<NodeId>> {
    let (last, outer) = chain.split_last()?;
    let mut failed = HashSet::new();

    (start..tree.len()).find_map(|id| {
        let node = tree.node(id);
        if node.ref_count_delta != delta || !node.matches_pattern(&last.text, true) {
            return None;
        }
        if outer.is_empty() {
            return Some(vec![id]);
        }

        // A frame's own flag says how it hangs below the frame before it
        let mut path = check_ancestors(tree, id, chain, outer.len() - 1, last.immediate, &mut failed)?;
        path.push(id);
        Some(path)
    })
}

/// Match `chain[index]` and everything before it on the ancestors of `child`
///
/// **Private** - backtracks: when the outer frames fail above an accepted
/// ancestor, a non-immediate step retries higher up the chain. `failed` holds
/// the `(child, index, immediate)` states already known to fail; leaves found
/// later in the same scan share most of their ancestors.
fn check_ancestors(
    tree: &CallTree,
    child: NodeId,
    chain: &[FramePattern],
    index: usize,
    immediate: bool,
    failed: &mut HashSet<(NodeId, usize, bool)>,
) -> Option<Vec<NodeId>> {
    if failed.contains(&(child, index, immediate)) {
        return None;
    }

    let path = ancestor_path(tree, child, chain, index, immediate, failed);
    if path.is_none() {
        failed.insert((child, index, immediate));
    }
    path
}

fn ancestor_path(
    tree: &CallTree,
    child: NodeId,
    chain: &[FramePattern],
    index: usize,
    immediate: bool,
    failed: &mut HashSet<(NodeId, usize, bool)>,
) -> Option<Vec<NodeId>> {
    let pattern = &chain[index];

    let found = if immediate {
        tree.parent(child)
            .filter(|&p| tree.node(p).matches_pattern(&pattern.text, false))
    } else {
        tree.ancestors(child)
            .find(|&p| tree.node(p).matches_pattern(&pattern.text, false))
    }?;

    if index == 0 {
        return Some(vec![found]);
    }

    if let Some(mut path) = check_ancestors(tree, found, chain, index - 1, pattern.immediate, failed) {
        path.push(found);
        return Some(path);
    }

    if immediate {
        None
    } else {
        check_ancestors(tree, found, chain, index, immediate, failed)
    }
}

/// Search the siblings following `anchor` for a root-down Release match
///
/// **Public** - scoped Release search
///
/// `chain[0]` is tested on each later sibling of `anchor`; the rest of the
/// chain is matched below it. The final frame must be a Release leaf.
pub fn find_release_in_scope(tree: &CallTree, anchor: NodeId, chain: &[FramePattern]) -> Option<Vec<NodeId>> {
    let parent = tree.parent(anchor)?;
    let first = chain.first()?;
    let is_bottom = chain.len() == 1;

    let siblings = tree.children(parent);
    let after = siblings.iter().position(|&c| c == anchor)? + 1;
    let mut failed = HashSet::new();

    siblings[after..].iter().find_map(|&sibling| {
        if !frame_matches(tree, sibling, first, is_bottom) {
            return None;
        }
        if is_bottom {
            return Some(vec![sibling]);
        }
        let mut path = check_descendants(tree, sibling, chain, 1, &mut failed)?;
        path.insert(0, sibling);
        Some(path)
    })
}

/// Match `chain[index..]` below `parent`
///
/// **Private** - a non-immediate frame may skip any number of levels; both a
/// non-matching child and a matching child whose subtree fails are searched
/// deeper before moving on to the next sibling. `(parent, index)` states that
/// already failed are recorded in `failed` and not searched again.
fn check_descendants(
    tree: &CallTree,
    parent: NodeId,
    chain: &[FramePattern],
    index: usize,
    failed: &mut HashSet<(NodeId, usize)>,
) -> Option<Vec<NodeId>> {
    if failed.contains(&(parent, index)) {
        return None;
    }

    let pattern = &chain[index];
    let is_bottom = index == chain.len() - 1;

    for &child in tree.children(parent) {
        if frame_matches(tree, child, pattern, is_bottom) {
            if is_bottom {
                return Some(vec![child]);
            }
            if let Some(mut path) = check_descendants(tree, child, chain, index + 1, failed) {
                path.insert(0, child);
                return Some(path);
            }
        }

        if !pattern.immediate {
            if let Some(path) = check_descendants(tree, child, chain, index, failed) {
                return Some(path);
            }
        }
    }

    failed.insert((parent, index));
    None
}

fn frame_matches(tree: &CallTree, id: NodeId, pattern: &FramePattern, is_bottom: bool) -> bool {
    let node = tree.node(id);
    node.matches_pattern(&pattern.text, is_bottom) && (!is_bottom || node.ref_count_delta == RELEASE_DELTA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::pattern::split_chain;
    use crate::parser::parse_trace;
    use crate::utils::config::AnalysisConfig;
    use pretty_assertions::assert_eq;

    fn tree(raw: &str) -> CallTree {
        let config = AnalysisConfig::default();
        CallTree::stitch(&parse_trace(raw, &config), &config)
    }

    fn row(tree: &CallTree, label: &str) -> NodeId {
        tree.rows().iter().position(|n| n.label == label).unwrap()
    }

    // 0 root, 1 Outer, 2 Middle, 3 Foo::AddRef, 4 Direct, 5 Foo::AddRef
    const NESTED: &str = "\
ref count is 1
Stack begin
app!Foo::AddRef+0x1
app!Middle+0x1
app!Outer+0x1
app!main+0x1
Stack end
ref count is 2
Stack begin
app!Foo::AddRef+0x2
app!Direct+0x1
app!main+0x1
Stack end
";

    #[test]
    fn test_immediate_parent_required() {
        let tree = tree(NESTED);

        let direct = find_unattributed_match(&tree, 0, &split_chain("Outer -> Foo::AddRef"), 1);
        assert_eq!(direct, None);

        let via_middle = find_unattributed_match(&tree, 0, &split_chain("Middle -> Foo::AddRef"), 1);
        assert_eq!(
            via_middle,
            Some(vec![row(&tree, "app!Middle+0x1"), row(&tree, "app!Foo::AddRef+0x1")])
        );
    }

    #[test]
    fn test_transitive_ancestor_allowed() {
        let tree = tree(NESTED);
        let found = find_unattributed_match(&tree, 0, &split_chain("Outer --> Foo::AddRef"), 1).unwrap();
        assert_eq!(found, vec![row(&tree, "app!Outer+0x1"), row(&tree, "app!Foo::AddRef+0x1")]);
    }

    #[test]
    fn test_ancestor_search_backtracks() {
        // The nearest "Run" above the leaf is not called by Owner; the search
        // has to give it up and take the outer one.
        let tree = tree(
            "\
ref count is 1
Stack begin
app!Foo::AddRef+0x1
app!Run+0x2
app!Other+0x1
app!Run+0x1
app!Owner+0x1
app!main+0x1
Stack end
ref count is 0
Stack begin
app!Foo::Release+0x1
app!main+0x1
Stack end
",
        );

        let found = find_unattributed_match(&tree, 0, &split_chain("Owner -> Run --> Foo::AddRef"), 1).unwrap();
        assert_eq!(
            found,
            vec![
                row(&tree, "app!Owner+0x1"),
                row(&tree, "app!Run+0x1"),
                row(&tree, "app!Foo::AddRef+0x1"),
            ]
        );

        // With an immediate link the nearest Run is forced and there is no retry
        let strict = find_unattributed_match(&tree, 0, &split_chain("Owner -> Run -> Foo::AddRef"), 1);
        assert_eq!(strict, None);
    }

    #[test]
    fn test_attributed_rows_do_not_match() {
        let mut tree = tree(NESTED);
        let first = row(&tree, "app!Foo::AddRef+0x1");
        tree.attribute(first, "explained");

        let found = find_unattributed_match(&tree, 0, &split_chain("Foo::AddRef"), 1).unwrap();
        assert_eq!(found, vec![row(&tree, "app!Foo::AddRef+0x2")]);
    }

    #[test]
    fn test_descendant_search_skips_levels_and_backtracks() {
        // Scope frame Owner+0x2 holds the Release two levels down; the first
        // "Helper" branch under it is a dead end.
        let tree = tree(
            "\
ref count is 1
Stack begin
app!Foo::AddRef+0x1
app!Owner+0x1
app!main+0x1
Stack end
ref count is 2
Stack begin
app!Other::AddRef+0x1
app!Helper+0x1
app!Owner+0x2
app!main+0x1
Stack end
ref count is 1
Stack begin
app!Other::Release+0x1
app!Helper+0x2
app!Owner+0x2
app!main+0x1
Stack end
ref count is 0
Stack begin
app!Foo::Release+0x1
app!Wrapper+0x1
app!Helper+0x3
app!Owner+0x2
app!main+0x1
Stack end
",
        );

        let anchor = row(&tree, "app!Owner+0x1");
        let found = find_release_in_scope(&tree, anchor, &split_chain("Owner --> Helper --> Foo::Release")).unwrap();
        assert_eq!(
            found,
            vec![
                row(&tree, "app!Owner+0x2"),
                row(&tree, "app!Helper+0x3"),
                row(&tree, "app!Foo::Release+0x1"),
            ]
        );

        let strict = find_release_in_scope(&tree, anchor, &split_chain("Owner --> Helper -> Foo::Release"));
        assert_eq!(strict, None);
    }

    /// One capture per entry of `leaves`, each below `depth` frames of `app!Frame<n>`
    fn deep_trace(leaves: &[&str], depth: usize) -> String {
        let mut raw = String::new();
        for (i, leaf) in leaves.iter().enumerate() {
            raw.push_str(&format!("ref count is {}\nStack begin\napp!{}+0x{:x}\n", i, leaf, i + 1));
            for level in (0..depth).rev() {
                raw.push_str(&format!("app!Frame{}+0x{:x}\n", level, i + 1));
            }
            raw.push_str("app!main+0x1\nStack end\n");
        }
        raw
    }

    #[test]
    fn test_deep_failing_ancestor_chain_finishes() {
        let leaves = vec!["Foo::AddRef"; 20];
        let tree = tree(&deep_trace(&leaves, 80));
        assert!(tree.len() > 1600);

        // Every frame matches "app" and nothing matches "Nope": without pruning
        // this tries every combination of ancestors for every leaf.
        let chain = split_chain("Nope --> app --> app --> app --> app --> Foo::AddRef");
        let started = std::time::Instant::now();
        assert_eq!(find_unattributed_match(&tree, 0, &chain, 1), None);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));

        // The same depth still matches when the outermost frame exists
        let chain = split_chain("Frame0 --> app --> app --> app --> app --> Foo::AddRef");
        let found = find_unattributed_match(&tree, 0, &chain, 1).unwrap();
        assert_eq!(found.len(), 6);
        assert_eq!(found[0], row(&tree, "app!Frame0+0x1"));
        assert_eq!(found[5], row(&tree, "app!Foo::AddRef+0x1"));
    }

    #[test]
    fn test_deep_failing_descendant_chain_finishes() {
        // Owner+0x1 holds the AddRef; its sibling Owner+0x2 heads a 40-frame
        // deep branch with an unrelated Release at the bottom.
        let raw = format!(
            "ref count is 1\nStack begin\napp!Foo::AddRef+0x1\napp!Owner+0x1\napp!main+0x1\nStack end\n{}",
            deep_trace(&["Bar::Release"], 40).replace("app!Frame0+0x1", "app!Owner+0x2")
        );
        let tree = tree(&raw);
        let anchor = row(&tree, "app!Owner+0x1");

        let chain = split_chain("Owner --> app --> app --> app --> app --> app --> Nope::Release");
        let started = std::time::Instant::now();
        assert_eq!(find_release_in_scope(&tree, anchor, &chain), None);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));

        let chain = split_chain("Owner --> app --> app --> app --> app --> app --> Bar::Release");
        let found = find_release_in_scope(&tree, anchor, &chain).unwrap();
        assert_eq!(found.first(), Some(&row(&tree, "app!Owner+0x2")));
        assert_eq!(found.last(), Some(&row(&tree, "app!Bar::Release+0x1")));
    }
}
