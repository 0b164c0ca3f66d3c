//! Trace parsing.
//!
//! This module handles:
//! - Parsing individual stack-frame lines
//! - Grouping frames into reference-count captures and identifying their polarity
//! - Reading whole trace dumps

pub mod capture;
pub mod frame;
pub mod trace;

// Re-export main types
pub use capture::{Polarity, RefCountStack};
pub use frame::StackFrame;
pub use trace::{parse_trace, read_trace_file};
