//! RefLeak Studio
//!
//! Reference-count leak analysis for call stacks captured by a
//! time-travel debugger on every AddRef and Release of one object.
//!
//! This crate provides the core implementation for the
//! `refleak` CLI tool:
//! - [`parser`] reads the capture dump
//! - [`tree`] stitches the captures into one annotated call tree
//! - [`heuristics`] pairs AddRefs with Releases from rule files
//! - [`session`] is the programmatic boundary for front ends
//! - [`output`] writes reports, annotated traces and terminal views
//!
//! ## Getting Started
//!
//! ```bash
//! refleak analyze --trace leak.txt --rules known_pairs.txt --tree --unattributed
//! ```

pub mod commands;
pub mod heuristics;
pub mod output;
pub mod parser;
pub mod session;
pub mod tree;
pub mod utils;

pub use session::Session;
