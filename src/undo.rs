/// Undo functionality for reverting an organize run.
///
/// This module replays a transaction log in descending sequence order:
/// files go back to their original locations, overwritten files are put back
/// from their backups, and directories created by the run are removed once
/// they are empty. Problems with single entries are reported per entry; only
/// an unreadable or corrupt log aborts the whole undo.
use chrono::Local;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{Span, debug, field, info, info_span, warn};

use crate::duplicate::unique_with_numeric_suffix;
use crate::file_organizer::serialize_display;
use crate::fs_move;
use crate::transaction_log::{ActionTaken, LoadedLog, LogEntry, LogError, LogStore};

/// Why a single entry could not be reversed.
#[derive(Debug, Error)]
pub enum UndoEntryError {
    #[error("{} no longer exists", .0.display())]
    DestinationMissing(PathBuf),

    #[error("backup {} of the overwritten file is missing", .0.display())]
    BackupMissing(PathBuf),

    #[error("could not move conflicting file {} aside: {source}", path.display())]
    ConflictBackup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not recreate directory {}: {source}", path.display())]
    CreateParent {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {} back to {}: {source}", from.display(), to.display())]
    Restore {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not remove directory {}: {source}", path.display())]
    RemoveDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Terminal state of one log entry.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UndoOutcome {
    Succeeded,
    Failed {
        #[serde(serialize_with = "serialize_display")]
        error: UndoEntryError,
    },
    /// The change cannot be reversed and was left alone.
    NotUndoable { reason: String },
    /// Nothing needed to be done.
    NoAction { reason: String },
}

/// Outcome of one entry, in processing order.
#[derive(Debug, Serialize)]
pub struct UndoEntryResult {
    pub sequence: u64,
    pub action: &'static str,
    /// Where the file or directory was expected to be.
    pub path: PathBuf,
    /// Where a file was restored to.
    pub restored_to: Option<PathBuf>,
    /// Where a file occupying the original location was moved aside.
    pub conflict_backup: Option<PathBuf>,
    #[serde(flatten)]
    pub outcome: UndoOutcome,
}

/// Aggregate counts of an undo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UndoCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub not_undoable: usize,
    pub no_action: usize,
}

/// Represents the result of an undo operation.
#[derive(Debug, Serialize)]
pub struct UndoReport {
    pub run_id: String,
    pub log_path: PathBuf,
    pub dry_run: bool,
    pub counts: UndoCounts,
    pub entries: Vec<UndoEntryResult>,
    /// Where the log was archived, when it was consumed.
    pub consumed_log: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl UndoReport {
    /// Returns true if no entry failed to reverse.
    pub fn is_complete_success(&self) -> bool {
        self.counts.failed == 0
    }

    /// Files put back at their original location.
    pub fn restored_files(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.restored_to.is_some() && matches!(e.outcome, UndoOutcome::Succeeded))
            .count()
    }
}

/// Simulated view of the tree while undoing, shared by dry and live runs.
#[derive(Default)]
struct UndoState {
    vacated: HashSet<PathBuf>,
    filled: HashSet<PathBuf>,
}

impl UndoState {
    fn occupied(&self, path: &Path) -> bool {
        self.filled.contains(path)
            || (fs_move::path_occupied(path) && !self.vacated.contains(path))
    }

    fn move_path(&mut self, from: &Path, to: &Path) {
        self.vacated.insert(from.to_path_buf());
        self.filled.remove(from);
        self.vacated.remove(to);
        self.filled.insert(to.to_path_buf());
    }

    fn remove(&mut self, path: &Path) {
        self.vacated.insert(path.to_path_buf());
        self.filled.remove(path);
    }
}

/// Reverses organize runs recorded under one root.
pub struct UndoManager {
    store: LogStore,
    dry_run: bool,
    span: Span,
}

impl UndoManager {
    /// Undo manager for logs stored under `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            store: LogStore::for_root(root),
            dry_run: false,
            span: info_span!("undo", root = %root.display(), run_id = field::Empty),
        }
    }

    /// Check every entry and report what would happen, without touching anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Undoes the run named by `identifier` (a run id or a log file path).
    ///
    /// # Errors
    ///
    /// Returns a [`LogError`] if the log is missing, already consumed or
    /// corrupt. Nothing is changed in that case.
    ///
    /// # Edge Cases Handled
    ///
    /// * **File no longer at its destination**: reported as failed, unless it
    ///   is already back at its original location
    /// * **File name conflict**: the occupying file is backed up with a timestamp suffix
    /// * **Overwrite without backup**: reported as not undoable
    /// * **Directory not empty**: left in place
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirtidy::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// let result = UndoManager::new(Path::new("/path/to/directory")).undo("20261016T101500Z-1a2b3c4d");
    /// match result {
    ///     Ok(report) => println!("Restored {} files", report.restored_files()),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(&self, identifier: &str) -> Result<UndoReport, LogError> {
        let _enter = self.span.enter();
        let log = self.store.load(identifier)?;
        self.span.record("run_id", log.header.run_id.as_str());
        info!(log = %log.path.display(), entries = log.entries.len(), dry_run = self.dry_run, "undoing run");

        let mut report = UndoReport {
            run_id: log.header.run_id.clone(),
            log_path: log.path.clone(),
            dry_run: self.dry_run,
            counts: UndoCounts::default(),
            entries: Vec::with_capacity(log.entries.len()),
            consumed_log: None,
            warnings: Vec::new(),
        };
        if !log.is_finalized() {
            report
                .warnings
                .push("the run did not finish; undoing the entries it recorded".to_string());
        }

        let mut state = UndoState::default();
        for entry in log.entries.iter().rev() {
            let result = self.undo_entry(&log, entry, &mut state);
            match &result.outcome {
                UndoOutcome::Succeeded => report.counts.succeeded += 1,
                UndoOutcome::Failed { error } => {
                    warn!(sequence = entry.sequence, error = %error, "entry not reversed");
                    report.counts.failed += 1;
                }
                UndoOutcome::NotUndoable { reason } => {
                    warn!(sequence = entry.sequence, reason = %reason, "entry not undoable");
                    report.counts.not_undoable += 1;
                }
                UndoOutcome::NoAction { .. } => report.counts.no_action += 1,
            }
            report.entries.push(result);
        }

        if !self.dry_run && report.is_complete_success() {
            match self.store.consume(&log) {
                Ok(path) => {
                    report.consumed_log = Some(path);
                    self.remove_run_backups(&log.header.run_id);
                }
                Err(e) => {
                    warn!(error = %e, "could not archive transaction log");
                    report
                        .warnings
                        .push(format!("log was not archived and could be undone again: {e}"));
                }
            }
        } else if !self.dry_run {
            report.warnings.push(
                "some entries failed; the log was kept so undo can be retried".to_string(),
            );
        }

        info!(
            succeeded = report.counts.succeeded,
            failed = report.counts.failed,
            not_undoable = report.counts.not_undoable,
            "undo finished"
        );
        Ok(report)
    }

    fn undo_entry(&self, log: &LoadedLog, entry: &LogEntry, state: &mut UndoState) -> UndoEntryResult {
        let mut result = UndoEntryResult {
            sequence: entry.sequence,
            action: entry.action_taken.kind(),
            path: entry.action_taken.final_path().to_path_buf(),
            restored_to: entry.action_taken.original_source_path().map(Path::to_path_buf),
            conflict_backup: None,
            outcome: UndoOutcome::Succeeded,
        };

        if let Some(reason) = log.failure_for(entry.sequence) {
            result.restored_to = None;
            result.outcome = UndoOutcome::NoAction {
                reason: format!("change was never applied: {reason}"),
            };
            return result;
        }

        result.outcome = match &entry.action_taken {
            ActionTaken::Skipped { .. } => {
                result.restored_to = None;
                UndoOutcome::NoAction {
                    reason: "file was skipped".to_string(),
                }
            }
            ActionTaken::CreatedDirectory { path } => {
                result.restored_to = None;
                self.remove_created_dir(path, state)
            }
            ActionTaken::Moved {
                original_source_path,
                final_destination_path,
                ..
            } => self.restore(
                final_destination_path,
                original_source_path,
                state,
                &mut result.conflict_backup,
            ),
            ActionTaken::Overwritten {
                backup_path: None, ..
            } => {
                result.restored_to = None;
                UndoOutcome::NotUndoable {
                    reason: "file was overwritten without a backup".to_string(),
                }
            }
            ActionTaken::Overwritten {
                original_source_path,
                final_destination_path,
                backup_path: Some(backup),
                ..
            } => {
                let outcome = self.restore(
                    final_destination_path,
                    original_source_path,
                    state,
                    &mut result.conflict_backup,
                );
                match outcome {
                    UndoOutcome::Succeeded => self.restore_backup(backup, final_destination_path, state),
                    // An earlier undo restored the file but not the backup.
                    UndoOutcome::NoAction { .. }
                        if state.occupied(backup) && !state.occupied(final_destination_path) =>
                    {
                        self.restore_backup(backup, final_destination_path, state)
                    }
                    other => other,
                }
            }
        };
        result
    }

    /// Move `from` back to `to`, making room at `to` if needed.
    fn restore(
        &self,
        from: &Path,
        to: &Path,
        state: &mut UndoState,
        conflict_backup: &mut Option<PathBuf>,
    ) -> UndoOutcome {
        if !state.occupied(from) {
            if state.occupied(to) {
                return UndoOutcome::NoAction {
                    reason: format!("{} is already at its original location", to.display()),
                };
            }
            return UndoOutcome::Failed {
                error: UndoEntryError::DestinationMissing(from.to_path_buf()),
            };
        }

        if state.occupied(to) {
            let aside = generate_backup_path(to, |p| state.occupied(p));
            if !self.dry_run
                && let Err(source) = fs_move::move_file_no_clobber(to, &aside)
            {
                return UndoOutcome::Failed {
                    error: UndoEntryError::ConflictBackup {
                        path: to.to_path_buf(),
                        source,
                    },
                };
            }
            warn!(path = %to.display(), backup = %aside.display(), "original location occupied; moved existing file aside");
            state.move_path(to, &aside);
            *conflict_backup = Some(aside);
        }

        if !self.dry_run {
            if let Some(parent) = to.parent()
                && !parent.is_dir()
                && let Err(source) = fs::create_dir_all(parent)
            {
                return UndoOutcome::Failed {
                    error: UndoEntryError::CreateParent {
                        path: parent.to_path_buf(),
                        source,
                    },
                };
            }
            if let Err(source) = fs_move::move_file_no_clobber(from, to) {
                return UndoOutcome::Failed {
                    error: UndoEntryError::Restore {
                        from: from.to_path_buf(),
                        to: to.to_path_buf(),
                        source,
                    },
                };
            }
        }

        debug!(from = %from.display(), to = %to.display(), "restored");
        state.move_path(from, to);
        UndoOutcome::Succeeded
    }

    /// Put the content replaced by an overwrite back at `destination`.
    fn restore_backup(&self, backup: &Path, destination: &Path, state: &mut UndoState) -> UndoOutcome {
        if !state.occupied(backup) {
            return UndoOutcome::Failed {
                error: UndoEntryError::BackupMissing(backup.to_path_buf()),
            };
        }
        if !self.dry_run
            && let Err(source) = fs_move::move_file_no_clobber(backup, destination)
        {
            return UndoOutcome::Failed {
                error: UndoEntryError::Restore {
                    from: backup.to_path_buf(),
                    to: destination.to_path_buf(),
                    source,
                },
            };
        }
        debug!(backup = %backup.display(), dst = %destination.display(), "restored overwritten file");
        state.move_path(backup, destination);
        if !self.dry_run
            && let Some(seq_dir) = backup.parent()
            && let Err(e) = fs::remove_dir(seq_dir)
        {
            debug!(dir = %seq_dir.display(), error = %e, "backup directory left in place");
        }
        UndoOutcome::Succeeded
    }

    /// Remove the run's backup directory once nothing is left in it.
    fn remove_run_backups(&self, run_id: &str) {
        let dir = self.store.backups_dir(run_id);
        if !dir.is_dir() {
            return;
        }
        match fs::remove_dir(&dir) {
            Ok(()) => debug!(dir = %dir.display(), "removed backup directory"),
            Err(e) => debug!(dir = %dir.display(), error = %e, "backup directory left in place"),
        }
    }

    fn remove_created_dir(&self, path: &Path, state: &mut UndoState) -> UndoOutcome {
        if !path.is_dir() || state.vacated.contains(path) {
            return UndoOutcome::NoAction {
                reason: "directory no longer exists".to_string(),
            };
        }

        match dir_is_empty(path, state) {
            Ok(true) => {}
            Ok(false) => {
                return UndoOutcome::NoAction {
                    reason: "directory is not empty; left in place".to_string(),
                };
            }
            Err(source) => {
                return UndoOutcome::Failed {
                    error: UndoEntryError::RemoveDirectory {
                        path: path.to_path_buf(),
                        source,
                    },
                };
            }
        }

        if !self.dry_run
            && let Err(source) = fs::remove_dir(path)
        {
            return UndoOutcome::Failed {
                error: UndoEntryError::RemoveDirectory {
                    path: path.to_path_buf(),
                    source,
                },
            };
        }
        debug!(dir = %path.display(), "removed directory");
        state.remove(path);
        UndoOutcome::Succeeded
    }
}

fn dir_is_empty(path: &Path, state: &UndoState) -> io::Result<bool> {
    for entry in fs::read_dir(path)? {
        if !state.vacated.contains(&entry?.path()) {
            return Ok(false);
        }
    }
    Ok(!state.filled.iter().any(|p| p.parent() == Some(path)))
}

/// Generates a free backup path for a file by appending a timestamp.
///
/// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
fn generate_backup_path<F>(original_path: &Path, is_taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let filename = original_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());

    let candidate = original_path.with_file_name(format!("{filename}.bak.{timestamp}"));
    if is_taken(&candidate) {
        unique_with_numeric_suffix(&candidate, is_taken)
    } else {
        candidate
    }
}
