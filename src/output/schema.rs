//! JSON report schema.
//!
//! The report is the machine-readable result of one `analyze` run.
//! Fields are only ever added, and `version` is bumped when they are.

use crate::tree::TreeStats;
use serde::{Deserialize, Serialize};

/// Top-level analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Report schema version (e.g. "1.0.0")
    pub version: String,

    /// Trace file the report was produced from
    pub trace: String,

    /// Leaf counts after every rule was applied
    pub stats: TreeStats,

    /// Applied rules in order
    pub rules: Vec<RuleReport>,

    /// Rows in the stitched tree, root included
    pub total_rows: usize,

    /// Captures left out of the tree because they broke a stitching invariant
    pub dropped_captures: usize,

    /// ISO 8601 timestamp
    pub generated_at: String,
}

/// Matches of one applied rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReport {
    pub name: String,
    pub matches: Vec<MatchReport>,
}

/// One tagged AddRef/Release pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub addref_row: usize,
    pub addref_label: String,
    pub release_row: usize,
    pub release_label: String,
}

impl AnalysisReport {
    /// Total pairs tagged across all rules
    pub fn total_matches(&self) -> usize {
        self.rules.iter().map(|r| r.matches.len()).sum()
    }
}
