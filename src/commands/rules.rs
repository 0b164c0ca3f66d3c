//! Rules command: check a rule file and print it back in normalised form.

use crate::heuristics::{load_rules, render_rules, HeuristicKind};
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a rule file and print what survived
///
/// **Public** - main entry point called from main.rs
///
/// Blocks dropped while parsing are reported through the log.
///
/// # Returns
/// Number of usable rules
pub fn execute_rules(file_path: &Path) -> Result<usize> {
    println!("Validating rules: {}", file_path.display());

    let rules = load_rules(file_path).with_context(|| format!("Failed to load rules {}", file_path.display()))?;

    let line_rules = rules
        .iter()
        .filter(|r| matches!(r.kind, HeuristicKind::LineMatch { .. }))
        .count();

    println!("✓ {} usable rules", rules.len());
    println!("  Pattern rules: {}", rules.len() - line_rules);
    println!("  Line rules:    {}", line_rules);
    println!();
    print!("{}", render_rules(&rules));

    Ok(rules.len())
}
