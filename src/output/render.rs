//! Terminal rendering of the call tree and its statistics.
//!
//! Rows are printed in pre-order with their row number, so the numbers can be
//! used directly in `+@` / `-@` rules. Single-child chains are not indented
//! further, which keeps long call chains readable.

use crate::tree::{CallTree, NodeId, TreeStats};
use crate::utils::config::{COMMENT_KEYWORD, TT_COMMAND};
use colored::*;

const BRANCH: &str = "|- ";
const PIPE: &str = "|    ";

/// Render the tree, one row per line
///
/// **Public** - main entry point for the `tree` view
///
/// # Arguments
/// * `tree` - Stitched tree
/// * `unattributed_only` - Only list rows that neither they nor an ancestor explain
pub fn render_tree(tree: &CallTree, unattributed_only: bool) -> String {
    let layout = layout(tree);
    let rows: Vec<NodeId> = if unattributed_only {
        tree.unattributed_rows()
    } else {
        (0..tree.len()).collect()
    };

    let mut out = String::new();
    for id in rows {
        out.push_str(&render_row(tree, id, layout[id]));
        out.push('\n');
    }
    out
}

/// Indent level and branch flag of a row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RowLayout {
    level: usize,
    branches: bool,
}

/// Compute the layout of every row
///
/// A child sits one level deeper than its parent only when it has siblings.
fn layout(tree: &CallTree) -> Vec<RowLayout> {
    let mut rows = vec![RowLayout::default(); tree.len()];
    if let Some(root) = rows.first_mut() {
        root.branches = true;
    }

    // Pre-order: every parent is laid out before its children
    for id in 1..tree.len() {
        let Some(parent) = tree.parent(id) else { continue };
        let siblings = tree.children(parent).len();
        let parent_level = rows[parent].level;
        rows[id] = RowLayout {
            level: if siblings == 1 { parent_level } else { parent_level + 1 },
            branches: siblings > 1,
        };
    }
    rows
}

fn indent(layout: RowLayout) -> String {
    if layout.level == 0 {
        return String::new();
    }
    let mut out = PIPE.repeat(layout.level - 1);
    out.push_str(if layout.branches { BRANCH } else { PIPE });
    out
}

fn render_row(tree: &CallTree, id: NodeId, layout: RowLayout) -> String {
    let node = tree.node(id);

    let delta = format!("{:>+5}", node.ref_count_delta);
    let delta = match node.ref_count_delta {
        d if d > 0 => delta.red(),
        d if d < 0 => delta.green(),
        _ => delta.normal(),
    };

    let label = if !node.is_root() && node.children.is_empty() {
        if node.ref_count_delta > 0 {
            node.label.red()
        } else {
            node.label.green()
        }
    } else {
        node.label.normal()
    };

    let mut row = format!("{:>5} {} {}{}", id, delta, indent(layout), label);
    if !node.position.is_empty() {
        row.push_str(&format!("  {}{}", TT_COMMAND, node.position).dimmed().to_string());
    }
    if !node.tag.is_empty() {
        row.push_str(&format!("  {} {}", COMMENT_KEYWORD, node.tag).cyan().to_string());
    }
    row
}

/// Format statistics as a framed terminal summary
pub fn format_stats_summary(stats: &TreeStats) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(80));
    out.push('\n');
    out.push_str(&"Reference Count Summary".bold().to_string());
    out.push('\n');
    out.push_str(&"=".repeat(80));
    out.push('\n');

    out.push_str(&format!(
        "AddRef:   {:>6} unattributed, {:>6} attributed\n",
        stats.unattributed_addref, stats.attributed_addref
    ));
    out.push_str(&format!(
        "Release:  {:>6} unattributed, {:>6} attributed\n",
        stats.unattributed_release, stats.attributed_release
    ));
    out.push_str(&format!("Net:      {:>+6}\n", stats.net()));
    out.push_str(&"=".repeat(80));
    out.push('\n');

    let status = if stats.unattributed_addref == 0 && stats.unattributed_release == 0 {
        "✅ All reference count changes explained".green().bold()
    } else {
        format!(
            "⚠️  {} AddRef / {} Release still unexplained",
            stats.unattributed_addref, stats.unattributed_release
        )
        .yellow()
        .bold()
    };
    out.push_str(&status.to_string());
    out.push('\n');
    out
}
