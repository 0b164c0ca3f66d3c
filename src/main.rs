//! RefLeak Studio CLI
//!
//! Stitches AddRef/Release call stacks into a tree and pairs them with
//! heuristic rules until only the leaking references remain unexplained.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use refleak_studio::commands::{
    display_version, execute_analyze, execute_rules, execute_tree, validate_analyze_args,
    AnalyzeArgs, TreeArgs,
};

/// RefLeak Studio - reference-count leak analysis
#[derive(Parser, Debug)]
#[command(name = "refleak")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Stitch a trace, apply rules and report what is left
    Analyze {
        /// Trace dump with one stack per reference-count change
        #[arg(short, long)]
        trace: PathBuf,

        /// Heuristic rule file (repeatable, applied in order)
        #[arg(short, long)]
        rules: Vec<PathBuf>,

        /// TOML analysis config
        #[arg(short, long, env = "REFLEAK_CONFIG")]
        config: Option<PathBuf>,

        /// Write the annotated trace to this file
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Write a JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the stitched tree
        #[arg(long)]
        tree: bool,

        /// Only print rows no tag explains (with --tree)
        #[arg(long)]
        unattributed: bool,

        /// Print a framed statistics summary
        #[arg(long)]
        summary: bool,
    },

    /// Print the stitched tree of a trace
    Tree {
        /// Trace dump
        #[arg(short, long)]
        trace: PathBuf,

        /// TOML analysis config
        #[arg(short, long, env = "REFLEAK_CONFIG")]
        config: Option<PathBuf>,

        /// Only print rows no tag explains
        #[arg(long)]
        unattributed: bool,
    },

    /// Validate a rule file and print it normalised
    Rules {
        /// Path to the rule file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            trace,
            rules,
            config,
            save,
            report,
            tree,
            unattributed,
            summary,
        } => {
            let args = AnalyzeArgs {
                trace,
                rules,
                config,
                save,
                report,
                print_tree: tree,
                unattributed_only: unattributed,
                print_summary: summary,
            };

            // Validate args first
            validate_analyze_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Tree {
            trace,
            config,
            unattributed,
        } => {
            execute_tree(TreeArgs {
                trace,
                config,
                unattributed_only: unattributed,
            })?;
        }

        Commands::Rules { file } => {
            execute_rules(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
