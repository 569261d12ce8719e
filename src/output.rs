//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, report rendering and JSON output.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::file_organizer::{Outcome, RunReport};
use crate::planner::PlanningError;
use crate::transaction_log::LogSummary;
use crate::undo::{UndoOutcome, UndoReport};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for operations
/// - Run, undo and history reports
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirtidy::output::OutputFormatter;
    /// OutputFormatter::success("File organized successfully!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints any report as pretty JSON on stdout.
    pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Creates and returns a progress bar for file operations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirtidy::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints a summary table with file statistics by category.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirtidy::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = category_counts
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count, "file"),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files, "file"),
            width = width
        );
    }

    /// Prints the outcome of an organize run.
    pub fn run_report(report: &RunReport, root: &Path) {
        let label = if report.dry_run { "Would move" } else { "Moved" };

        for result in &report.results {
            let src = display_relative(&result.source, root);
            let dst = display_relative(&result.destination, root);
            match &result.outcome {
                Outcome::Moved => Self::success(&format!("{label} {src} → {dst}")),
                Outcome::Overwritten { undoable, .. } => {
                    let note = if *undoable { "" } else { " (not undoable)" };
                    Self::warning(&format!("Overwrote {dst} with {src}{note}"))
                }
                Outcome::Skipped => Self::plain(&format!("  skipped {src}: {dst} exists")),
                Outcome::Failed { error } => Self::error(&format!("{src}: {error}")),
            }
        }

        let counts = report.category_counts();
        let placed = report.counts.moved + report.counts.overwritten;
        if placed > 0 {
            Self::summary_table(&counts, placed);
        }

        println!();
        Self::plain(&format!(
            "{} moved, {} skipped, {} overwritten, {} failed",
            report.counts.moved.to_string().green(),
            report.counts.skipped,
            report.counts.overwritten.to_string().yellow(),
            colour_failures(report.counts.failed),
        ));

        for warning in &report.warnings {
            Self::warning(warning);
        }

        if report.dry_run {
            Self::dry_run_notice("No files were modified.");
        } else if let Some(log) = &report.log_path {
            Self::info(&format!("Run id: {}", report.run_id));
            Self::info(&format!("Transaction log: {}", log.display()));
            Self::plain(&format!(
                "Use 'dirtidy undo {} --path {}' to revert these changes.",
                report.run_id,
                root.display()
            ));
        }
    }

    /// Prints the outcome of an undo.
    pub fn undo_report(report: &UndoReport) {
        for entry in &report.entries {
            let path = entry.path.display();
            match &entry.outcome {
                UndoOutcome::Succeeded => match &entry.restored_to {
                    Some(to) => Self::success(&format!("Restored {} → {}", path, to.display())),
                    None => Self::success(&format!("Removed {path}")),
                },
                UndoOutcome::Failed { error } => Self::error(&format!("#{} {}", entry.sequence, error)),
                UndoOutcome::NotUndoable { reason } => {
                    Self::warning(&format!("#{} {path}: {reason}", entry.sequence))
                }
                UndoOutcome::NoAction { reason } => {
                    Self::plain(&format!("  #{} {path}: {reason}", entry.sequence))
                }
            }
            if let Some(aside) = &entry.conflict_backup {
                Self::warning(&format!("Existing file moved aside to {}", aside.display()));
            }
        }

        println!();
        Self::plain(&format!(
            "{} reversed, {} failed, {} not undoable, {} unchanged",
            report.counts.succeeded.to_string().green(),
            colour_failures(report.counts.failed),
            report.counts.not_undoable.to_string().yellow(),
            report.counts.no_action,
        ));

        for warning in &report.warnings {
            Self::warning(warning);
        }

        if report.dry_run {
            Self::dry_run_notice("Nothing was changed.");
        } else if let Some(archived) = &report.consumed_log {
            Self::info(&format!("Log archived as {}", archived.display()));
        }
    }

    /// Prints directories that could not be walked.
    pub fn planning_errors(errors: &[PlanningError]) {
        if errors.is_empty() {
            return;
        }
        Self::header("UNREADABLE");
        for error in errors {
            Self::error(&error.to_string());
        }
    }

    /// Prints the logs stored under a root.
    pub fn history(logs: &[LogSummary]) {
        if logs.is_empty() {
            Self::info("No organize runs recorded here.");
            return;
        }
        Self::header("HISTORY");
        for log in logs {
            let state = if log.consumed {
                "undone".dimmed()
            } else if log.finalized {
                "undoable".green()
            } else {
                "interrupted".yellow()
            };
            println!(
                "{}  {}  {:>4} {}  {}",
                log.run_id.bold(),
                log.started_at.format("%Y-%m-%d %H:%M:%S"),
                log.entries,
                plural(log.entries, "entry"),
                state
            );
        }
    }
}

fn plural(count: usize, word: &str) -> String {
    match (count, word) {
        (1, _) => word.to_string(),
        (_, "entry") => "entries".to_string(),
        _ => format!("{word}s"),
    }
}

fn colour_failures(failed: usize) -> ColoredString {
    if failed > 0 {
        failed.to_string().red().bold()
    } else {
        failed.to_string().normal()
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "file"), "file");
        assert_eq!(plural(2, "file"), "files");
        assert_eq!(plural(0, "entry"), "entries");
    }

    #[test]
    fn test_display_relative_strips_root() {
        assert_eq!(
            display_relative(Path::new("/r/Images/a.jpg"), Path::new("/r")),
            Path::new("Images/a.jpg").display().to_string()
        );
        assert_eq!(
            display_relative(Path::new("/elsewhere/a.jpg"), Path::new("/r")),
            "/elsewhere/a.jpg"
        );
    }
}
