//! Trace dump reader.
//!
//! Turns the debugger's text dump into a list of [`RefCountStack`] captures.
//! Each capture looks like:
//!
//! ```text
//! ref count is 2
//! Time Travel Position: 1A2B:3C
//! Stack begin
//! Module!Function+0x10 [source @ 12]
//! ...
//! Stack end
//! ```
//!
//! Reading is defensive: malformed lines are skipped and logged, never fatal.

use super::capture::RefCountStack;
use super::frame::StackFrame;
use crate::utils::config::{AnalysisConfig, REF_COUNT_IS, STACK_BEGIN, STACK_END, TIME_TRAVEL_POSITION};
use crate::utils::error::TraceError;
use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;

/// Parse a trace dump into captures
///
/// **Public** - main entry point for trace parsing
///
/// # Arguments
/// * `raw` - Full text of the trace dump
/// * `config` - Analysis settings (first-capture default)
///
/// # Returns
/// Captures in file order. Never fails on content.
pub fn parse_trace(raw: &str, config: &AnalysisConfig) -> Vec<RefCountStack> {
    let mut captures: Vec<RefCountStack> = Vec::new();
    let mut in_stack = false;
    let mut frame_index = 0usize;
    let mut skipped_lines = 0usize;

    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim_end();

        if let Some(count) = line.strip_prefix(REF_COUNT_IS) {
            let ref_count = count.trim().parse::<i64>().unwrap_or_else(|_| {
                warn!("Line {}: invalid ref count '{}', using 0", line_no + 1, count.trim());
                0
            });
            captures.push(RefCountStack::new(ref_count));
            frame_index = 0;
            continue;
        }

        if let Some(position) = line.strip_prefix(TIME_TRAVEL_POSITION) {
            // Position lines before the first capture are debugger chatter
            if let Some(current) = captures.last_mut() {
                current.position = position.trim().to_string();
            }
            continue;
        }

        match line.trim() {
            STACK_BEGIN => {
                in_stack = true;
                continue;
            }
            STACK_END => {
                in_stack = false;
                continue;
            }
            _ => {}
        }

        if !in_stack {
            continue;
        }

        let Some(current) = captures.last_mut() else {
            skipped_lines += 1;
            continue;
        };

        if let Some(frame) = StackFrame::parse(line, frame_index) {
            if !current.add_line(frame) {
                error!(
                    "Line {}: frame {} breaks the capture's frame order, skipped",
                    line_no + 1,
                    frame_index
                );
            }
            frame_index += 1;
        }
    }

    if skipped_lines > 0 {
        debug!("Skipped {} frame lines outside of any capture", skipped_lines);
    }

    if config.default_first_capture_to_addref {
        if let Some(first) = captures.first_mut() {
            first.default_to_addref();
        }
    }

    info!("Parsed {} captures", captures.len());
    captures
}

/// Read and parse a trace file
///
/// **Public** - convenience wrapper over [`parse_trace`]
///
/// # Errors
/// * `TraceError::ReadFailed` - File cannot be read
pub fn read_trace_file(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<Vec<RefCountStack>, TraceError> {
    let path = path.as_ref();
    debug!("Reading trace from: {}", path.display());

    let raw = fs::read_to_string(path)?;
    Ok(parse_trace(&raw, config))
}
