//! Output writers for analysis results.
//!
//! This module handles writing data to disk and to the terminal:
//! - JSON analysis reports
//! - Annotated trace dumps (the input format, tags included)
//! - Plain-text tree views and statistics summaries

pub mod render;
pub mod report;
pub mod schema;
pub mod trace;

// Re-export main functions
pub use render::{format_stats_summary, render_tree};
pub use report::{build_report, read_report, write_report};
pub use schema::{AnalysisReport, MatchReport, RuleReport};
pub use trace::{render_trace, write_trace};

use crate::utils::error::OutputError;
use log::debug;
use std::path::Path;

/// Validate an output path and create its parent directories
///
/// **Private** - shared by the file writers of this module
///
/// # Errors
/// * `OutputError::InvalidPath` - Path is empty, is a directory, or its parent cannot be created
fn prepare_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

/// Size of a written file, 0 when it cannot be read
fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
