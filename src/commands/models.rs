use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Trace dump to analyse
    pub trace: PathBuf,

    /// Rule files, applied in order
    pub rules: Vec<PathBuf>,

    /// Optional TOML analysis config
    pub config: Option<PathBuf>,

    /// Write the annotated trace here
    pub save: Option<PathBuf>,

    /// Write the JSON report here
    pub report: Option<PathBuf>,

    /// Print the stitched tree
    pub print_tree: bool,

    /// Restrict the printed tree to unexplained rows
    pub unattributed_only: bool,

    /// Print the statistics summary
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            trace: PathBuf::new(),
            rules: Vec::new(),
            config: None,
            save: None,
            report: None,
            print_tree: false,
            unattributed_only: false,
            print_summary: false,
        }
    }
}

/// Arguments for the tree command
#[derive(Debug, Clone, Default)]
pub struct TreeArgs {
    pub trace: PathBuf,
    pub config: Option<PathBuf>,
    pub unattributed_only: bool,
}
