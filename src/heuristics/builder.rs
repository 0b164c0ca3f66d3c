//! Building a heuristic from two chosen rows.
//!
//! Mark one row as the AddRef and one as the Release, in either order.
//! Once both are set, a pattern heuristic is produced whose patterns are the
//! rows' `module!function+offset` text, named after the first marked row.

use super::pattern::{Heuristic, Scope};
use crate::tree::{CallTree, NodeId};
use log::debug;

#[derive(Debug, Clone, Default)]
pub struct HeuristicBuilder {
    name: Option<String>,
    addref: Option<String>,
    release: Option<String>,
}

impl HeuristicBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `row` as the AddRef side
    ///
    /// # Returns
    /// The finished heuristic once both sides are set, `None` otherwise
    /// (also when `row` is not a frame row)
    pub fn mark_addref(&mut self, tree: &CallTree, row: NodeId) -> Option<Heuristic> {
        let pattern = self.remember(tree, row)?;
        self.addref = Some(pattern);
        self.try_finish()
    }

    /// Use `row` as the Release side
    pub fn mark_release(&mut self, tree: &CallTree, row: NodeId) -> Option<Heuristic> {
        let pattern = self.remember(tree, row)?;
        self.release = Some(pattern);
        self.try_finish()
    }

    /// Forget anything marked so far
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn remember(&mut self, tree: &CallTree, row: NodeId) -> Option<String> {
        let node = tree.get(row).filter(|n| !n.is_root())?;
        if self.name.is_none() {
            self.name = Some(node.function.clone());
        }
        Some(node.module_function_and_offset())
    }

    fn try_finish(&mut self) -> Option<Heuristic> {
        if self.addref.is_none() || self.release.is_none() {
            return None;
        }

        let builder = std::mem::take(self);
        let name = builder.name.unwrap_or_default();
        let addref = builder.addref.unwrap_or_default();
        let release = builder.release.unwrap_or_default();
        debug!("Built heuristic '{}': + {} / - {}", name, addref, release);

        Heuristic::pattern(name, Scope::None, addref, vec![release])
    }
}
