//! Configuration and constants for trace analysis.
//!
//! The trace and rule formats are fixed and live here as constants.
//! The tunable parts of the analysis are loaded from TOML into [`AnalysisConfig`].

use super::error::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Trace dump markers (debugger capture output)
pub const REF_COUNT_IS: &str = "ref count is ";
pub const TIME_TRAVEL_POSITION: &str = "Time Travel Position: ";
pub const STACK_BEGIN: &str = "Stack begin";
pub const STACK_END: &str = "Stack end";

/// Command prefix shown next to rows that carry a capture position
pub const TT_COMMAND: &str = "!ttdext.tt ";

// Heuristic rule file keywords
pub const COMMENT_KEYWORD: &str = "//";
pub const NAME_START_KEYWORD: char = '[';
pub const NAME_END_KEYWORD: char = ']';
pub const SCOPE_KEYWORD: char = '=';
pub const WILDCARD_SCOPE_KEYWORD: &str = "*";
pub const ADDREF_KEYWORD: char = '+';
pub const ADDREF_LINE_KEYWORD: &str = "+@";
pub const RELEASE_KEYWORD: char = '-';
pub const RELEASE_LINE_KEYWORD: &str = "-@";

// Frame chain separators. The transitive one must be split first since it contains the immediate one.
pub const IMMEDIATE_SEPARATOR: &str = "->";
pub const TRANSITIVE_SEPARATOR: &str = "-->";

/// Synthetic tag placed on a node once every child below it is attributed
pub const ALL_CHILDREN_ACCOUNTED_FOR: &str = "[All children accounted for]";

/// Default wrapper frames collapsed by the bottom trim pass
pub const DEFAULT_ADDREF_WRAPPER_MARKER: &str = "CDependencyObject::AddRef";
pub const DEFAULT_RELEASE_WRAPPER_MARKER: &str = "CDependencyObject::Release";

/// One entry of the polarity allow-list, tested against a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolarityRule {
    /// Function name contains the text
    Function(&'static str),
    /// Source location contains the text
    Source(&'static str),
    /// Function name contains the first text and offset contains the second
    FunctionAtOffset(&'static str, &'static str),
}

/// Frames identifying an AddRef capture. Checked before [`RELEASE_RULES`].
pub const ADDREF_RULES: &[PolarityRule] = &[
    PolarityRule::Function("AddRef"),
    PolarityRule::Function("AddStrong"),
    PolarityRule::Function("xref::details::optional_ref_count::set_local_flag"),
    PolarityRule::Function("Microsoft::WRL2::NestableRuntimeClass::InternalAddRef"),
    PolarityRule::Function("CDependencyObject::CDependencyObject"),
    PolarityRule::Function("DirectUI::DependencyObject::DependencyObject"),
    PolarityRule::Function("EncodeWeakReferencePointer"),
    // WeakReferenceImpl::Resolve both increments and decrements; this line is the increment
    PolarityRule::Source("WeakReference.cpp @ 25"),
    PolarityRule::FunctionAtOffset("::Resolve", "0x23"),
    PolarityRule::Function("::QueryInterface"),
];

/// Frames identifying a Release capture
pub const RELEASE_RULES: &[PolarityRule] = &[
    PolarityRule::Function("Release"),
    PolarityRule::FunctionAtOffset("::Resolve", "0x3b"),
];

/// Tunable analysis settings
///
/// Every field has a default, so an empty TOML file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Force the first capture of a trace to AddRef when no frame identified it.
    /// The first capture is normally the object's constructor.
    pub default_first_capture_to_addref: bool,

    /// Collapse the known wrapper AddRef/Release frames at the bottom of the tree
    pub trim_bottom: bool,

    /// Label substring identifying the wrapper AddRef frame
    pub addref_wrapper_marker: String,

    /// Label substring identifying the wrapper Release frame
    pub release_wrapper_marker: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_first_capture_to_addref: true,
            trim_bottom: true,
            addref_wrapper_marker: DEFAULT_ADDREF_WRAPPER_MARKER.to_string(),
            release_wrapper_marker: DEFAULT_RELEASE_WRAPPER_MARKER.to_string(),
        }
    }
}

/// Load analysis configuration from a TOML file
///
/// # Errors
/// * `ConfigError::ReadFailed` - If file cannot be read
/// * `ConfigError::ParseFailed` - If TOML is invalid
pub fn load_config(path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let path = path.as_ref();
    debug!("Loading analysis config from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    let config: AnalysisConfig = toml::from_str(&contents)?;
    Ok(config)
}
