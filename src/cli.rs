//! Command-line interface module for dirtidy.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing and validation
//! - Merging configuration with command-line flags
//! - Organization orchestration
//! - Undo and history handling

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::duplicate::DuplicatePolicy;
use crate::file_organizer::{FileOrganizer, OrganizerOptions, RunReport};
use crate::logging::LogLevel;
use crate::output::OutputFormatter;
use crate::planner::{PlanBuilder, PlanOptions};
use crate::transaction_log::LogStore;
use crate::undo::UndoManager;

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    /// The command completed but some operations or entries failed.
    pub const PARTIAL_FAILURE: i32 = 1;
    /// The command could not run at all.
    pub const FATAL: i32 = 2;
}

/// Organize files into category folders, with dry-run preview and undo.
#[derive(Debug, Parser)]
#[command(name = "dirtidy", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Diagnostic verbosity (written to stderr).
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Normal)]
    pub log_level: LogLevel,

    /// Also write diagnostics to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Emit diagnostics as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move files of a directory into category subfolders.
    Organize(OrganizeArgs),
    /// Reverse a previous organize run using its transaction log.
    Undo(UndoArgs),
    /// List the organize runs recorded for a directory.
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Directory to organize.
    pub path: PathBuf,

    /// Descend into subdirectories.
    #[arg(long, short)]
    pub recursive: bool,

    /// Show what would happen without changing anything.
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// What to do when a destination already exists.
    #[arg(long, value_enum)]
    pub on_duplicate: Option<DuplicatePolicy>,

    /// Keep each file's sub-path below its category folder (with --recursive).
    #[arg(long)]
    pub keep_structure: bool,

    /// Include hidden files and directories.
    #[arg(long)]
    pub include_hidden: bool,

    /// Directory name to skip while walking; may be repeated.
    #[arg(long = "exclude-dir", value_name = "NAME")]
    pub exclude_dirs: Vec<String>,

    /// Create category folders under this subdirectory instead of the root.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not keep a backup of files replaced by --on-duplicate overwrite.
    #[arg(long)]
    pub no_backup: bool,

    /// Configuration file to use instead of the default lookup.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct UndoArgs {
    /// Run id or path of the transaction log to reverse.
    pub log: String,

    /// Directory the run organized (where run ids are looked up).
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Report what would be reversed without changing anything.
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Directory whose runs to list (defaults to the current directory).
    pub path: Option<PathBuf>,

    /// Print the list as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Runs a parsed command and returns the process exit code.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use dirtidy::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["dirtidy", "organize", "/path/to/directory", "--dry-run"]);
/// let code = run_cli(cli)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn run_cli(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Organize(args) => organize(args),
        Command::Undo(args) => undo(args),
        Command::History(args) => history(args),
    }
}

#[derive(Serialize)]
struct OrganizeOutput<'a> {
    root: &'a Path,
    report: Option<&'a RunReport>,
    planning_errors: Vec<String>,
}

/// Plans and executes an organize run.
pub fn organize(args: OrganizeArgs) -> Result<i32> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot access {}", args.path.display()))?;

    let config = Config::load(args.config.as_deref()).context("loading configuration")?;
    let mut filters = config
        .compile_filters()
        .context("compiling filter rules")?;
    if args.include_hidden {
        filters.set_hidden_files(true);
    }
    filters.exclude_directories(&args.exclude_dirs);
    let mapper = config.file_mapper().context("loading category overrides")?;

    let output_dir = args
        .output_dir
        .or_else(|| config.organize.output_dir.as_ref().map(PathBuf::from));
    if let Some(dir) = &output_dir
        && dir.is_absolute()
    {
        bail!("--output-dir must be relative to {}", root.display());
    }

    let plan_options = PlanOptions {
        recursive: args.recursive || config.organize.recursive,
        keep_structure: args.keep_structure || config.organize.keep_structure,
        output_dir,
    };
    let organizer_options = OrganizerOptions {
        on_duplicate: args.on_duplicate.unwrap_or(config.organize.on_duplicate),
        dry_run: args.dry_run,
        backup_overwritten: !args.no_backup && config.organize.backup_overwritten,
    };
    debug!(?plan_options, ?organizer_options, "organize options");

    if !args.json {
        if args.dry_run {
            OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", root.display()));
        } else {
            OutputFormatter::info(&format!("Organizing contents of: {}", root.display()));
        }
    }

    let plan = PlanBuilder::new(&root, &mapper, &filters, plan_options)
        .build()
        .context("planning")?;
    let planning_failed = !plan.errors.is_empty();

    let report = if plan.is_empty() {
        None
    } else {
        let mut organizer =
            FileOrganizer::start(&root, organizer_options).context("opening transaction log")?;
        let progress = (!args.json)
            .then(|| OutputFormatter::create_progress_bar(plan.operations.len() as u64));
        for op in &plan.operations {
            if let Some(pb) = &progress {
                pb.set_message(
                    op.source
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                );
            }
            organizer.execute(op);
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        Some(organizer.finish())
    };

    if args.json {
        OutputFormatter::json(&OrganizeOutput {
            root: &root,
            report: report.as_ref(),
            planning_errors: plan.errors.iter().map(ToString::to_string).collect(),
        })?;
    } else {
        OutputFormatter::planning_errors(&plan.errors);
        match &report {
            Some(report) => OutputFormatter::run_report(report, &root),
            None => OutputFormatter::plain("No files found to organize."),
        }
    }

    let failed = report.as_ref().is_some_and(RunReport::has_failures);
    Ok(if failed || planning_failed {
        exit::PARTIAL_FAILURE
    } else {
        exit::SUCCESS
    })
}

fn root_or_cwd(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    path.canonicalize()
        .with_context(|| format!("cannot access {}", path.display()))
}

/// Reverses a run.
pub fn undo(args: UndoArgs) -> Result<i32> {
    let root = root_or_cwd(args.path)?;
    let report = UndoManager::new(&root)
        .dry_run(args.dry_run)
        .undo(&args.log)
        .with_context(|| format!("cannot undo '{}'", args.log))?;

    if args.json {
        OutputFormatter::json(&report)?;
    } else {
        OutputFormatter::undo_report(&report);
    }

    Ok(if report.is_complete_success() {
        exit::SUCCESS
    } else {
        exit::PARTIAL_FAILURE
    })
}

/// Lists stored runs.
pub fn history(args: HistoryArgs) -> Result<i32> {
    let root = root_or_cwd(args.path)?;
    let logs = LogStore::for_root(&root)
        .list()
        .context("reading transaction logs")?;

    if args.json {
        OutputFormatter::json(&logs)?;
    } else {
        OutputFormatter::history(&logs);
    }
    Ok(exit::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_organize_flags() {
        let cli = Cli::try_parse_from([
            "dirtidy",
            "organize",
            "/tmp/x",
            "--recursive",
            "--dry-run",
            "--on-duplicate",
            "skip",
            "--exclude-dir",
            "node_modules",
            "--exclude-dir",
            ".git",
        ])
        .expect("parse");

        let Command::Organize(args) = cli.command else {
            panic!("expected organize");
        };
        assert!(args.recursive);
        assert!(args.dry_run);
        assert_eq!(args.on_duplicate, Some(DuplicatePolicy::Skip));
        assert_eq!(args.exclude_dirs, vec!["node_modules", ".git"]);
        assert_eq!(cli.log_level, LogLevel::Normal);
    }

    #[test]
    fn test_parse_undo_with_global_log_level() {
        let cli = Cli::try_parse_from([
            "dirtidy",
            "undo",
            "20261016T101500Z-1a2b3c4d",
            "--path",
            "/tmp/x",
            "--log-level",
            "debug",
        ])
        .expect("parse");

        assert_eq!(cli.log_level, LogLevel::Debug);
        let Command::Undo(args) = cli.command else {
            panic!("expected undo");
        };
        assert_eq!(args.log, "20261016T101500Z-1a2b3c4d");
        assert_eq!(args.path, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let result = Cli::try_parse_from(["dirtidy", "organize", ".", "--on-duplicate", "merge"]);
        assert!(result.is_err());
    }
}
