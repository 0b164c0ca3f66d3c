//! Analyze and tree command implementations.
//!
//! The analyze command:
//! 1. Loads the analysis config
//! 2. Parses and stitches the trace
//! 3. Applies every rule file in order
//! 4. Writes the requested outputs

use super::models::{AnalyzeArgs, TreeArgs};
use crate::heuristics::load_rules;
use crate::output::{build_report, format_stats_summary, render_tree, write_report, write_trace};
use crate::session::Session;
use crate::utils::config::{load_config, AnalysisConfig};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Analyze command arguments
///
/// # Returns
/// The session after every rule was applied
///
/// # Errors
/// * Config, trace or rule files that cannot be read
/// * Output files that cannot be written
pub fn execute_analyze(args: AnalyzeArgs) -> Result<Session> {
    let start_time = Instant::now();
    info!("Starting analysis of: {}", args.trace.display());

    // Step 1: Config
    info!("Step 1/4: Loading analysis config...");
    let config = resolve_config(args.config.as_deref())?;
    debug!("Analysis config: {:?}", config);

    // Step 2: Trace
    info!("Step 2/4: Parsing and stitching trace...");
    let mut session = Session::load_file(&args.trace, &config)
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;
    info!(
        "Stitched {} rows ({} captures dropped)",
        session.tree().len(),
        session.tree().dropped_captures()
    );

    // Step 3: Rules
    info!("Step 3/4: Applying {} rule files...", args.rules.len());
    for path in &args.rules {
        let rules = load_rules(path).with_context(|| format!("Failed to load rules {}", path.display()))?;
        let matched: usize = rules.iter().map(|rule| session.apply_heuristic(rule)).sum();
        info!("{}: {} rules, {} matches", path.display(), rules.len(), matched);
    }

    // Step 4: Outputs
    info!("Step 4/4: Writing output files...");
    if let Some(save_path) = &args.save {
        write_trace(session.tree(), save_path).context("Failed to write annotated trace")?;
        info!("✓ Annotated trace written to: {}", save_path.display());
    }

    if let Some(report_path) = &args.report {
        let report = build_report(&session, &args.trace);
        write_report(&report, report_path).context("Failed to write report JSON")?;
        info!("✓ Report written to: {}", report_path.display());
    }

    if args.print_tree {
        print!("{}", render_tree(session.tree(), args.unattributed_only));
    }

    let stats = session.statistics();
    if args.print_summary {
        println!();
        print!("{}", format_stats_summary(&stats));
    } else {
        println!("{}", stats.summary());
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(session)
}

/// Execute the tree command
///
/// **Public** - prints the stitched tree without applying any rules
pub fn execute_tree(args: TreeArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    let session = Session::load_file(&args.trace, &config)
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;

    print!("{}", render_tree(session.tree(), args.unattributed_only));
    Ok(())
}

/// Config from file, or the defaults
///
/// **Private** - shared by the commands of this module
fn resolve_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => load_config(path).with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_analyze_args(args: &AnalyzeArgs) -> Result<()> {
    validate_input(&args.trace, "Trace file")?;

    for rules in &args.rules {
        validate_input(rules, "Rule file")?;
    }

    if let Some(config) = &args.config {
        validate_input(config, "Config file")?;
    }

    if args.unattributed_only && !args.print_tree {
        anyhow::bail!("--unattributed only applies together with --tree");
    }

    Ok(())
}

fn validate_input(path: &Path, what: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        anyhow::bail!("{} path cannot be empty", what);
    }
    if !path.is_file() {
        anyhow::bail!("{} does not exist: {}", what, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::read_report;
    use std::path::PathBuf;
    use pretty_assertions::assert_eq;

    const TRACE: &str = "\
ref count is 1
Stack begin
app!Foo::AddRef+0x1
app!main+0x1
Stack end
ref count is 0
Stack begin
app!Foo::Release+0x1
app!main+0x1
Stack end
";

    const RULES: &str = "\
[Foo]
+ Foo::AddRef
- Foo::Release
";

    #[test]
    fn test_validate_rejects_missing_trace() {
        let args = AnalyzeArgs {
            trace: PathBuf::from("/definitely/not/here.txt"),
            ..Default::default()
        };
        assert!(validate_analyze_args(&args).is_err());
        assert!(validate_analyze_args(&AnalyzeArgs::default()).is_err());
    }

    #[test]
    fn test_validate_unattributed_needs_tree() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.txt");
        std::fs::write(&trace, TRACE).unwrap();

        let mut args = AnalyzeArgs {
            trace,
            unattributed_only: true,
            ..Default::default()
        };
        assert!(validate_analyze_args(&args).is_err());

        args.print_tree = true;
        assert!(validate_analyze_args(&args).is_ok());
    }

    #[test]
    fn test_execute_analyze_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.txt");
        let rules = dir.path().join("rules.txt");
        std::fs::write(&trace, TRACE).unwrap();
        std::fs::write(&rules, RULES).unwrap();

        let args = AnalyzeArgs {
            trace: trace.clone(),
            rules: vec![rules],
            save: Some(dir.path().join("out/annotated.txt")),
            report: Some(dir.path().join("out/report.json")),
            print_summary: false,
            ..Default::default()
        };
        validate_analyze_args(&args).unwrap();
        let session = execute_analyze(args).unwrap();

        assert_eq!(session.statistics().attributed_addref, 1);

        let saved = std::fs::read_to_string(dir.path().join("out/annotated.txt")).unwrap();
        assert!(saved.contains("app!Foo::AddRef+0x1 // [AddRef for Foo: match #1]"));

        let report = read_report(dir.path().join("out/report.json")).unwrap();
        assert_eq!(report.total_matches(), 1);
        assert_eq!(report.trace, trace.display().to_string());
    }

    #[test]
    fn test_missing_rule_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.txt");
        std::fs::write(&trace, TRACE).unwrap();

        let args = AnalyzeArgs {
            trace,
            rules: vec![dir.path().join("missing.rules")],
            print_summary: false,
            ..Default::default()
        };
        assert!(execute_analyze(args).is_err());
    }
}
