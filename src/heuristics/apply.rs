//! Applying heuristics to a tree and undoing them.

use super::matcher::find_match;
use super::pattern::{Heuristic, HeuristicKind};
use crate::tree::{CallTree, NodeId};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Rows tagged by one match of a heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub addref: NodeId,
    pub release: NodeId,
}

/// Tag written on the AddRef row of match number `n`
pub fn addref_tag(name: &str, n: usize) -> String {
    format!("[AddRef for {}: match #{}]", name, n)
}

/// Tag written on the Release row of match number `n`
pub fn release_tag(name: &str, n: usize) -> String {
    format!("[Release for {}: match #{}]", name, n)
}

/// Tag every AddRef/Release pair the heuristic finds
///
/// **Public** - main entry point for heuristic matching
///
/// Pattern heuristics repeat the search until no further AddRef matches,
/// tagging each full match right away so later searches skip it. An AddRef
/// without a partner is skipped, not tagged. Attribution is propagated once
/// at the end.
///
/// # Returns
/// The tagged pairs, numbered from 1 in order
pub fn apply_heuristic(tree: &mut CallTree, heuristic: &Heuristic) -> Vec<MatchPair> {
    let mut matches = Vec::new();

    match &heuristic.kind {
        HeuristicKind::LineMatch {
            addref_row,
            release_row,
        } => {
            if *addref_row >= tree.len() || *release_row >= tree.len() {
                warn!(
                    "Heuristic '{}': rows {} / {} are outside the tree ({} rows)",
                    heuristic.name,
                    addref_row,
                    release_row,
                    tree.len()
                );
                return matches;
            }
            tree.attribute(*addref_row, addref_tag(&heuristic.name, 1));
            tree.attribute(*release_row, release_tag(&heuristic.name, 1));
            matches.push(MatchPair {
                addref: *addref_row,
                release: *release_row,
            });
        }
        HeuristicKind::Pattern(pattern) => {
            let mut start = 0;
            while let Some(found) = find_match(tree, pattern, start) {
                let addref = found.addref_leaf();
                start = addref + 1;

                let Some(release) = found.release_leaf() else {
                    debug!("Heuristic '{}': AddRef at row {} has no Release", heuristic.name, addref);
                    continue;
                };

                let n = matches.len() + 1;
                tree.attribute(addref, addref_tag(&heuristic.name, n));
                tree.attribute(release, release_tag(&heuristic.name, n));
                matches.push(MatchPair { addref, release });
            }
        }
    }

    tree.propagate_all();
    info!("Heuristic '{}': {} matches", heuristic.name, matches.len());
    matches
}

/// Clear the tags of earlier matches and retract propagated markers
pub fn undo_matches(tree: &mut CallTree, matches: &[MatchPair]) {
    for pair in matches {
        for id in [pair.addref, pair.release] {
            if id < tree.len() {
                tree.unattribute(id);
                tree.propagate_up(id);
            }
        }
    }
    debug!("Undid {} matches", matches.len());
}
