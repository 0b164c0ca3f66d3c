//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod analyze;
pub mod models;
pub mod rules;
pub mod utils;

// Re-export main command functions
pub use analyze::{execute_analyze, execute_tree, validate_analyze_args};
pub use models::{AnalyzeArgs, TreeArgs};
pub use rules::execute_rules;
pub use utils::display_version;
