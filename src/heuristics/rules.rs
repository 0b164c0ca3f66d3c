//! Heuristic rule files.
//!
//! ```text
//! // comment
//! [RuleName]
//! = ScopeFunction          (optional, "*" for wildcard)
//! + Caller -> Foo::AddRef
//! - Caller --> Foo::Release
//! - Other::Release         (repeatable)
//!
//! [Pinned]
//! +@ 42
//! -@ 57
//! ```
//!
//! Incomplete blocks are dropped with a warning, never an error.

use super::pattern::{Heuristic, HeuristicKind, Scope};
use crate::utils::config::{
    ADDREF_KEYWORD, ADDREF_LINE_KEYWORD, COMMENT_KEYWORD, NAME_END_KEYWORD, NAME_START_KEYWORD,
    RELEASE_KEYWORD, RELEASE_LINE_KEYWORD, SCOPE_KEYWORD, WILDCARD_SCOPE_KEYWORD,
};
use crate::utils::error::RuleError;
use log::{debug, warn};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Fields collected for one `[Name]` block
#[derive(Debug, Default)]
struct RuleBlock {
    name: String,
    scope: Option<String>,
    addref: Option<String>,
    releases: Vec<String>,
    addref_row: Option<usize>,
    release_row: Option<usize>,
}

impl RuleBlock {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Turn the block into a heuristic, or `None` if it is incomplete
    fn finish(self) -> Option<Heuristic> {
        let has_lines = self.addref_row.is_some() || self.release_row.is_some();
        let has_pattern = self.addref.is_some() || !self.releases.is_empty();

        if has_lines && has_pattern {
            warn!("Rule '{}' mixes line numbers and patterns, dropped", self.name);
            return None;
        }

        if has_lines {
            return match (self.addref_row, self.release_row) {
                (Some(addref_row), Some(release_row)) => {
                    Some(Heuristic::line_match(self.name, addref_row, release_row))
                }
                _ => {
                    warn!("Rule '{}' needs both {} and {}, dropped", self.name, ADDREF_LINE_KEYWORD, RELEASE_LINE_KEYWORD);
                    None
                }
            };
        }

        let scope = match self.scope.as_deref() {
            None | Some("") => Scope::None,
            Some(WILDCARD_SCOPE_KEYWORD) => Scope::Wildcard,
            Some(name) => Scope::Named(name.to_string()),
        };

        let Some(addref) = self.addref else {
            warn!("Rule '{}' has no AddRef pattern, dropped", self.name);
            return None;
        };

        let name = self.name;
        let heuristic = Heuristic::pattern(name.clone(), scope, addref, self.releases);
        if heuristic.is_none() {
            warn!("Rule '{}' has no usable AddRef/Release patterns, dropped", name);
        }
        heuristic
    }
}

/// Parse the text of a rule file
///
/// **Public** - main entry point for rule parsing
///
/// # Returns
/// Complete rules in file order
pub fn parse_rules(text: &str) -> Vec<Heuristic> {
    let mut heuristics = Vec::new();
    let mut current: Option<RuleBlock> = None;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_KEYWORD) {
            continue;
        }

        if line.starts_with(NAME_START_KEYWORD) && line.ends_with(NAME_END_KEYWORD) {
            heuristics.extend(current.take().and_then(RuleBlock::finish));
            let name = line[1..line.len() - 1].trim();
            if name.is_empty() {
                warn!("Line {}: empty rule name, block ignored", line_no + 1);
            } else {
                current = Some(RuleBlock::named(name));
            }
            continue;
        }

        let Some(block) = current.as_mut() else {
            debug!("Line {}: outside any rule block, ignored", line_no + 1);
            continue;
        };

        // Two-character keywords first: "+@" also starts with '+'
        if let Some(value) = line.strip_prefix(ADDREF_LINE_KEYWORD) {
            block.addref_row = parse_row(value, line_no);
        } else if let Some(value) = line.strip_prefix(RELEASE_LINE_KEYWORD) {
            block.release_row = parse_row(value, line_no);
        } else if let Some(value) = line.strip_prefix(SCOPE_KEYWORD) {
            block.scope = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix(ADDREF_KEYWORD) {
            block.addref = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix(RELEASE_KEYWORD) {
            block.releases.push(value.trim().to_string());
        } else {
            debug!("Line {}: unrecognised rule line '{}'", line_no + 1, line);
        }
    }

    heuristics.extend(current.and_then(RuleBlock::finish));
    debug!("Parsed {} rules", heuristics.len());
    heuristics
}

fn parse_row(value: &str, line_no: usize) -> Option<usize> {
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        warn!("Line {}: '{}' is not a row number", line_no + 1, value.trim());
    }
    parsed
}

/// Read and parse a rule file
///
/// # Errors
/// * `RuleError::ReadFailed` - File cannot be read
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<Heuristic>, RuleError> {
    let path = path.as_ref();
    debug!("Reading rules from: {}", path.display());

    let text = fs::read_to_string(path).map_err(RuleError::ReadFailed)?;
    Ok(parse_rules(&text))
}

/// Render heuristics in rule-file syntax
///
/// The output parses back into the same heuristics.
pub fn render_rules(heuristics: &[Heuristic]) -> String {
    let mut out = String::new();

    for heuristic in heuristics {
        let _ = writeln!(out, "{}{}{}", NAME_START_KEYWORD, heuristic.name, NAME_END_KEYWORD);
        match &heuristic.kind {
            HeuristicKind::LineMatch {
                addref_row,
                release_row,
            } => {
                let _ = writeln!(out, "{} {}", ADDREF_LINE_KEYWORD, addref_row);
                let _ = writeln!(out, "{} {}", RELEASE_LINE_KEYWORD, release_row);
            }
            HeuristicKind::Pattern(pattern) => {
                if pattern.scope != Scope::None {
                    let _ = writeln!(out, "{} {}", SCOPE_KEYWORD, pattern.scope);
                }
                let _ = writeln!(out, "{} {}", ADDREF_KEYWORD, pattern.addref);
                for release in &pattern.releases {
                    let _ = writeln!(out, "{} {}", RELEASE_KEYWORD, release);
                }
            }
        }
        out.push('\n');
    }

    out
}

/// Write heuristics to a rule file
///
/// # Errors
/// * `RuleError::WriteFailed` - File cannot be written
pub fn write_rules(path: impl AsRef<Path>, heuristics: &[Heuristic]) -> Result<(), RuleError> {
    let path = path.as_ref();
    fs::write(path, render_rules(heuristics)).map_err(RuleError::WriteFailed)?;
    debug!("Wrote {} rules to {}", heuristics.len(), path.display());
    Ok(())
}
