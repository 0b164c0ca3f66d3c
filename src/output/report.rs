//! JSON analysis report writer.
//!
//! Builds an [`AnalysisReport`] from a session and writes it with proper formatting.

use super::schema::{AnalysisReport, MatchReport, RuleReport};
use super::{file_size, prepare_output_path};
use crate::session::Session;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Build a report for the current state of a session
///
/// **Public** - main entry point for report creation
///
/// # Arguments
/// * `session` - Session with every rule already applied
/// * `trace_path` - Trace file name recorded in the report
pub fn build_report(session: &Session, trace_path: impl AsRef<Path>) -> AnalysisReport {
    let tree = session.tree();
    let label = |row: usize| tree.get(row).map(|n| n.label.clone()).unwrap_or_default();

    let rules = session
        .applied()
        .iter()
        .map(|applied| RuleReport {
            name: applied.heuristic.name.clone(),
            matches: applied
                .matches
                .iter()
                .map(|pair| MatchReport {
                    addref_row: pair.addref,
                    addref_label: label(pair.addref),
                    release_row: pair.release,
                    release_label: label(pair.release),
                })
                .collect(),
        })
        .collect();

    AnalysisReport {
        version: SCHEMA_VERSION.to_string(),
        trace: trace_path.as_ref().display().to_string(),
        stats: session.statistics(),
        rules,
        total_rows: tree.len(),
        dropped_captures: tree.dropped_captures(),
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Write a report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Report to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_report(report: &AnalysisReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing report to: {}", output_path.display());

    prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report).map_err(OutputError::SerializationFailed)?;

    info!("Report written successfully ({} bytes)", file_size(output_path));
    Ok(())
}

/// Read a report from a JSON file
///
/// **Public** - useful for validation and testing
///
/// # Errors
/// * `OutputError::ReadFailed` - File read error
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<AnalysisReport, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::ReadFailed)?;
    let report: AnalysisReport = serde_json::from_reader(file).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Report loaded: version {}, trace {}, {} rules",
        report.version,
        report.trace,
        report.rules.len()
    );
    Ok(report)
}
