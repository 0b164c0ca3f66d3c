//! Analysis session: one loaded trace and the heuristics applied to it.
//!
//! This is the boundary a front end drives:
//! - load a trace, save it back with its annotations
//! - apply and undo heuristics
//! - annotate rows by hand, search, read statistics

use crate::heuristics::{apply_heuristic, load_rules, undo_matches, Heuristic, MatchPair};
use crate::output::trace::render_trace;
use crate::parser::{parse_trace, read_trace_file};
use crate::tree::{CallTree, CallTreeNode, NodeId, TreeStats};
use crate::utils::config::AnalysisConfig;
use crate::utils::error::TraceError;
use log::{info, warn};
use std::path::Path;

/// A heuristic together with the rows it tagged
#[derive(Debug, Clone)]
pub struct AppliedHeuristic {
    pub heuristic: Heuristic,
    pub matches: Vec<MatchPair>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    tree: CallTree,
    applied: Vec<AppliedHeuristic>,
    config: AnalysisConfig,
}

impl Session {
    /// Parse and stitch a trace dump
    ///
    /// **Public** - main entry point for a new analysis
    ///
    /// Tags already present in the dump are kept and propagated.
    pub fn load(raw: &str, config: &AnalysisConfig) -> Self {
        let captures = parse_trace(raw, config);
        let mut tree = CallTree::stitch(&captures, config);
        tree.propagate_all();

        Self {
            tree,
            applied: Vec::new(),
            config: config.clone(),
        }
    }

    /// Read a trace file and load it
    ///
    /// # Errors
    /// * `TraceError::ReadFailed` - File cannot be read
    pub fn load_file(path: impl AsRef<Path>, config: &AnalysisConfig) -> Result<Self, TraceError> {
        let path = path.as_ref();
        info!("Loading trace: {}", path.display());

        let captures = read_trace_file(path, config)?;
        let mut tree = CallTree::stitch(&captures, config);
        tree.propagate_all();

        Ok(Self {
            tree,
            applied: Vec::new(),
            config: config.clone(),
        })
    }

    /// Annotated trace text, one block per leaf
    pub fn save(&self) -> String {
        render_trace(&self.tree)
    }

    pub fn tree(&self) -> &CallTree {
        &self.tree
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Flat pre-order rows; the index is the row number
    pub fn rows(&self) -> &[CallTreeNode] {
        self.tree.rows()
    }

    pub fn applied(&self) -> &[AppliedHeuristic] {
        &self.applied
    }

    /// Apply one heuristic and record its matches
    ///
    /// # Returns
    /// Number of AddRef/Release pairs tagged
    pub fn apply_heuristic(&mut self, heuristic: &Heuristic) -> usize {
        let matches = apply_heuristic(&mut self.tree, heuristic);
        let count = matches.len();
        self.applied.push(AppliedHeuristic {
            heuristic: heuristic.clone(),
            matches,
        });
        count
    }

    /// Apply every rule of a rule file in order
    ///
    /// A file that cannot be read loads nothing.
    ///
    /// # Returns
    /// Total number of pairs tagged
    pub fn apply_rules_file(&mut self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        match load_rules(path) {
            Ok(rules) => rules.iter().map(|rule| self.apply_heuristic(rule)).sum(),
            Err(e) => {
                warn!("Skipping rules from {}: {}", path.display(), e);
                0
            }
        }
    }

    /// Undo the `index`-th applied heuristic and forget it
    ///
    /// # Returns
    /// The removed record, or `None` for an unknown index
    pub fn undo_heuristic(&mut self, index: usize) -> Option<AppliedHeuristic> {
        if index >= self.applied.len() {
            return None;
        }
        let removed = self.applied.remove(index);
        undo_matches(&mut self.tree, &removed.matches);
        info!("Undid heuristic '{}'", removed.heuristic.name);
        Some(removed)
    }

    pub fn statistics(&self) -> TreeStats {
        self.tree.statistics()
    }

    /// Set a free-form tag on a row and propagate it
    ///
    /// An empty tag clears the row. Unknown rows are ignored.
    pub fn annotate(&mut self, row: NodeId, tag: &str) {
        if row >= self.tree.len() {
            warn!("Cannot annotate row {}: tree has {} rows", row, self.tree.len());
            return;
        }
        self.tree.attribute(row, tag.trim());
        self.tree.propagate_up(row);
    }

    /// Drop every tag, including the ones loaded from the trace
    pub fn clear_annotations(&mut self) {
        self.tree.clear_annotations();
        self.applied.clear();
    }

    pub fn find_next(&self, from: NodeId, text: &str) -> Option<NodeId> {
        self.tree.find_next(from, text)
    }

    pub fn find_partner(&self, row: NodeId) -> Option<NodeId> {
        self.tree.find_partner(row)
    }

    pub fn unattributed_rows(&self) -> Vec<NodeId> {
        self.tree.unattributed_rows()
    }
}
