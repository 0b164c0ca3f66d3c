//! AddRef/Release pairing heuristics.
//!
//! This module handles:
//! - Compiling rule chains into frame patterns
//! - Searching the tree for matching AddRef/Release pairs
//! - Tagging and untagging matches
//! - Reading and writing rule files
//! - Building a rule from two chosen rows

pub mod apply;
pub mod builder;
pub mod matcher;
pub mod pattern;
pub mod rules;

// Re-export main types
pub use apply::{addref_tag, apply_heuristic, release_tag, undo_matches, MatchPair};
pub use builder::HeuristicBuilder;
pub use matcher::{find_match, MatchResult};
pub use pattern::{split_chain, FramePattern, Heuristic, HeuristicKind, PatternHeuristic, Scope};
pub use rules::{load_rules, parse_rules, render_rules, write_rules};
