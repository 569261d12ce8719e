/// Execution engine: applies planned moves and records them in the transaction log.
///
/// Every change is appended to the run's log before it is made. Missing
/// destination directories are logged as their own entries so undo can
/// remove them again once they are empty. A failed change gets a `failed`
/// record and the run carries on with the next operation.
///
/// In dry-run mode the same decisions are made against a simulated view of
/// the tree (destinations claimed and sources vacated earlier in the run),
/// but nothing is written to disk.
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{Span, debug, info, info_span, warn};

use crate::duplicate::{self, DuplicatePolicy, Resolution};
use crate::fs_move;
use crate::planner::PlannedOperation;
use crate::transaction_log::{
    ActionTaken, LogEntry, LogError, LogStore, RunCounts, RunHeader, TransactionLog, new_run_id,
};

/// Why a single operation could not be applied.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("source {} no longer exists", .0.display())]
    SourceMissing(PathBuf),

    #[error("{} is already at its destination", .0.display())]
    SameLocation(PathBuf),

    #[error("cannot overwrite directory {}", .0.display())]
    DestinationIsDirectory(PathBuf),

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to back up {} before overwriting: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("change not recorded: {0}")]
    LogWrite(#[from] LogError),
}

pub(crate) fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

/// Terminal state of one operation.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Moved,
    Skipped,
    Overwritten {
        backup_path: Option<PathBuf>,
        undoable: bool,
    },
    Failed {
        #[serde(serialize_with = "serialize_display")]
        error: OperationError,
    },
}

/// Result of [`FileOrganizer::execute`].
#[derive(Debug, Serialize)]
pub struct OperationResult {
    /// Sequence number of the entry describing the file change, if one was assigned.
    pub sequence: Option<u64>,
    pub source: PathBuf,
    /// Final destination after duplicate resolution.
    pub destination: PathBuf,
    pub category: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl OperationResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// Settings of one organize run.
#[derive(Debug, Clone, Copy)]
pub struct OrganizerOptions {
    pub on_duplicate: DuplicatePolicy,
    pub dry_run: bool,
    /// Preserve files replaced by `overwrite` so the replacement can be undone.
    pub backup_overwritten: bool,
}

impl Default for OrganizerOptions {
    fn default() -> Self {
        Self {
            on_duplicate: DuplicatePolicy::default(),
            dry_run: false,
            backup_overwritten: true,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    /// Identifier to pass to `undo`. `None` for dry runs.
    pub log_path: Option<PathBuf>,
    pub dry_run: bool,
    pub counts: RunCounts,
    pub results: Vec<OperationResult>,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }

    /// Files placed per category directory.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            if matches!(
                result.outcome,
                Outcome::Moved | Outcome::Overwritten { .. }
            ) {
                *counts.entry(result.category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|r| r.is_failure())
    }
}

#[derive(Default)]
struct Attempt {
    destination: Option<PathBuf>,
    sequence: Option<u64>,
}

/// Applies planned operations for one run, in order.
pub struct FileOrganizer {
    store: LogStore,
    run_id: String,
    options: OrganizerOptions,
    log: Option<TransactionLog>,
    last_sequence: u64,
    claimed: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
    created_dirs: HashSet<PathBuf>,
    results: Vec<OperationResult>,
    warnings: Vec<String>,
    counts: RunCounts,
    span: Span,
}

impl FileOrganizer {
    /// Start a run over `root`. A live run opens its transaction log here.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirtidy::file_category::Category;
    /// use dirtidy::file_organizer::{FileOrganizer, OrganizerOptions};
    /// use dirtidy::planner::PlannedOperation;
    /// use std::path::Path;
    ///
    /// let root = Path::new("/path/to/base");
    /// let mut organizer = FileOrganizer::start(root, OrganizerOptions::default())?;
    /// organizer.execute(&PlannedOperation {
    ///     source: root.join("image.png"),
    ///     destination: root.join("Images").join("image.png"),
    ///     category: Category::Image,
    /// });
    /// let report = organizer.finish();
    /// println!("undo with: {:?}", report.log_path);
    /// # Ok::<(), dirtidy::transaction_log::LogError>(())
    /// ```
    pub fn start(root: &Path, options: OrganizerOptions) -> Result<Self, LogError> {
        let store = LogStore::for_root(root);
        let run_id = new_run_id();
        let span = info_span!("organize", run_id = %run_id, dry_run = options.dry_run);

        let log = if options.dry_run {
            None
        } else {
            let header = RunHeader::new(run_id.clone(), root.to_path_buf(), options.on_duplicate);
            let log = store.create(header)?;
            span.in_scope(|| info!(log = %log.path().display(), "transaction log opened"));
            Some(log)
        };

        Ok(Self {
            store,
            run_id,
            options,
            log,
            last_sequence: 0,
            claimed: HashSet::new(),
            vacated: HashSet::new(),
            created_dirs: HashSet::new(),
            results: Vec::new(),
            warnings: Vec::new(),
            counts: RunCounts::default(),
            span,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Apply one operation. Failures are reported in the result, never raised.
    pub fn execute(&mut self, op: &PlannedOperation) -> &OperationResult {
        let span = self.span.clone();
        let _enter = span.enter();

        let mut attempt = Attempt::default();
        let outcome = match self.apply(op, &mut attempt) {
            Ok(outcome) => outcome,
            Err(error) => {
                if let (Some(sequence), Some(log)) = (attempt.sequence, self.log.as_mut())
                    && let Err(e) = log.mark_failed(sequence, &error.to_string())
                {
                    warn!(sequence, error = %e, "could not record failure in transaction log");
                }
                Outcome::Failed { error }
            }
        };

        match &outcome {
            Outcome::Moved => self.counts.moved += 1,
            Outcome::Skipped => self.counts.skipped += 1,
            Outcome::Overwritten { .. } => self.counts.overwritten += 1,
            Outcome::Failed { error } => {
                self.counts.failed += 1;
                warn!(src = %op.source.display(), error = %error, "operation failed");
            }
        }

        let result = OperationResult {
            sequence: attempt.sequence,
            source: op.source.clone(),
            destination: attempt
                .destination
                .unwrap_or_else(|| op.destination.clone()),
            category: op.category.dir_name().to_string(),
            outcome,
        };
        let index = self.results.len();
        self.results.push(result);
        &self.results[index]
    }

    /// Apply every operation in order.
    pub fn execute_all<'a, I>(&mut self, ops: I)
    where
        I: IntoIterator<Item = &'a PlannedOperation>,
    {
        for op in ops {
            self.execute(op);
        }
    }

    /// Close the run and write the log trailer.
    pub fn finish(mut self) -> RunReport {
        let _enter = self.span.enter();
        let log_path = match self.log.take() {
            Some(log) => {
                let path = log.path().to_path_buf();
                if let Err(e) = log.finalize(self.counts) {
                    warn!(error = %e, "could not finalize transaction log");
                    self.warnings
                        .push(format!("transaction log was not finalized: {e}"));
                }
                Some(path)
            }
            None => None,
        };

        info!(
            moved = self.counts.moved,
            skipped = self.counts.skipped,
            overwritten = self.counts.overwritten,
            failed = self.counts.failed,
            "run finished"
        );

        RunReport {
            run_id: self.run_id.clone(),
            log_path,
            dry_run: self.options.dry_run,
            counts: self.counts,
            results: std::mem::take(&mut self.results),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn apply(
        &mut self,
        op: &PlannedOperation,
        attempt: &mut Attempt,
    ) -> Result<Outcome, OperationError> {
        if op.source == op.destination {
            return Err(OperationError::SameLocation(op.source.clone()));
        }
        if !op.source.is_file() || self.vacated.contains(&op.source) {
            return Err(OperationError::SourceMissing(op.source.clone()));
        }

        let resolution = duplicate::resolve(&op.destination, self.options.on_duplicate, |p| {
            self.is_taken(p)
        });
        let destination = resolution.path().to_path_buf();
        attempt.destination = Some(destination.clone());
        debug!(src = %op.source.display(), dst = %destination.display(), ?resolution, "resolved destination");

        if let Resolution::Skip(_) = resolution {
            let sequence = self.record(ActionTaken::Skipped {
                original_source_path: op.source.clone(),
                final_destination_path: destination.clone(),
            })?;
            attempt.sequence = Some(sequence);
            info!(src = %op.source.display(), dst = %destination.display(), "skipped: destination exists");
            return Ok(Outcome::Skipped);
        }

        let overwrite = matches!(resolution, Resolution::Overwrite(_));
        if overwrite && destination.is_dir() {
            return Err(OperationError::DestinationIsDirectory(destination));
        }

        self.ensure_parent(&destination)?;

        let category = op.category.dir_name().to_string();
        let sequence = self.last_sequence + 1;
        let backup_path = (overwrite && self.options.backup_overwritten)
            .then(|| self.backup_path(sequence, &destination));

        let action = if overwrite {
            ActionTaken::Overwritten {
                original_source_path: op.source.clone(),
                final_destination_path: destination.clone(),
                category,
                backup_path: backup_path.clone(),
            }
        } else {
            ActionTaken::Moved {
                original_source_path: op.source.clone(),
                final_destination_path: destination.clone(),
                category,
            }
        };
        attempt.sequence = Some(self.record(action)?);

        if overwrite && backup_path.is_none() {
            warn!(dst = %destination.display(), "overwriting without backup");
            self.warnings.push(format!(
                "{} was overwritten without a backup; this change cannot be undone",
                destination.display()
            ));
        }

        if !self.options.dry_run {
            if let Some(backup) = &backup_path {
                self.move_to_backup(&destination, backup)?;
            }

            if let Err(source) = fs_move::move_file(&op.source, &destination) {
                if let Some(backup) = &backup_path
                    && let Err(e) = fs_move::move_file(backup, &destination)
                {
                    warn!(backup = %backup.display(), error = %e, "could not put overwritten file back");
                }
                return Err(OperationError::Move {
                    from: op.source.clone(),
                    to: destination,
                    source,
                });
            }
        }

        info!(src = %op.source.display(), dst = %destination.display(), "moved");
        self.vacated.insert(op.source.clone());
        self.claimed.insert(destination);

        Ok(if overwrite {
            Outcome::Overwritten {
                undoable: backup_path.is_some(),
                backup_path,
            }
        } else {
            Outcome::Moved
        })
    }

    /// Occupied on disk and not moved away in this run, or claimed by an earlier move.
    fn is_taken(&self, path: &Path) -> bool {
        self.claimed.contains(path)
            || (fs_move::path_occupied(path) && !self.vacated.contains(path))
    }

    fn dir_present(&self, path: &Path) -> bool {
        self.created_dirs.contains(path) || fs_move::path_occupied(path)
    }

    /// Create missing ancestors of `destination`, outermost first, logging each.
    fn ensure_parent(&mut self, destination: &Path) -> Result<(), OperationError> {
        let mut missing = Vec::new();
        let mut current = destination.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || self.dir_present(dir) {
                break;
            }
            missing.push(dir.to_path_buf());
            current = dir.parent();
        }

        for dir in missing.into_iter().rev() {
            let sequence = self.record(ActionTaken::CreatedDirectory { path: dir.clone() })?;
            if !self.options.dry_run
                && let Err(source) = fs::create_dir(&dir)
            {
                let error = OperationError::CreateDirectory { path: dir, source };
                if let Some(log) = self.log.as_mut()
                    && let Err(e) = log.mark_failed(sequence, &error.to_string())
                {
                    warn!(sequence, error = %e, "could not record failure in transaction log");
                }
                return Err(error);
            }
            debug!(dir = %dir.display(), "created directory");
            self.counts.directories_created += 1;
            self.created_dirs.insert(dir);
        }
        Ok(())
    }

    /// Assign the next sequence number and append the entry when live.
    fn record(&mut self, action: ActionTaken) -> Result<u64, OperationError> {
        let sequence = self.last_sequence + 1;
        self.last_sequence = sequence;
        if let Some(log) = self.log.as_mut() {
            log.append(&LogEntry::new(sequence, action))?;
        }
        Ok(sequence)
    }

    fn backup_path(&self, sequence: u64, destination: &Path) -> PathBuf {
        let name = destination
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "file".into());
        self.store
            .backups_dir(&self.run_id)
            .join(sequence.to_string())
            .join(name)
    }

    fn move_to_backup(&self, destination: &Path, backup: &Path) -> Result<(), OperationError> {
        let backup_err = |source| OperationError::Backup {
            path: destination.to_path_buf(),
            source,
        };
        if let Some(parent) = backup.parent() {
            fs::create_dir_all(parent).map_err(backup_err)?;
        }
        fs_move::move_file(destination, backup).map_err(backup_err)?;
        debug!(dst = %destination.display(), backup = %backup.display(), "backed up existing file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::Category;
    use crate::transaction_log::load_log;
    use tempfile::TempDir;

    fn op(root: &Path, name: &str, category: Category) -> PlannedOperation {
        PlannedOperation {
            source: root.join(name),
            destination: root.join(category.dir_name()).join(name),
            category,
        }
    }

    fn options(on_duplicate: DuplicatePolicy, dry_run: bool) -> OrganizerOptions {
        OrganizerOptions {
            on_duplicate,
            dry_run,
            backup_overwritten: true,
        }
    }

    #[test]
    fn test_execute_creates_directory_and_logs_before_move() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("test.txt"), "test content").expect("Failed to write test file");

        let mut organizer =
            FileOrganizer::start(root, OrganizerOptions::default()).expect("start");
        let result = organizer.execute(&op(root, "test.txt", Category::Document));
        assert!(matches!(result.outcome, Outcome::Moved));
        assert_eq!(result.sequence, Some(2));
        let report = organizer.finish();

        assert!(!root.join("test.txt").exists());
        assert!(root.join("Documents").join("test.txt").exists());
        assert_eq!(report.counts.moved, 1);
        assert_eq!(report.counts.directories_created, 1);

        let log = load_log(&report.log_path.expect("live run has a log")).expect("load");
        let kinds: Vec<_> = log.entries.iter().map(|e| e.action_taken.kind()).collect();
        assert_eq!(kinds, vec!["created_directory", "moved"]);
        assert!(log.is_finalized());
    }

    #[test]
    fn test_existing_category_directory_is_not_logged() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("Images")).expect("mkdir");
        fs::write(root.join("test.png"), "png").expect("write");

        let mut organizer =
            FileOrganizer::start(root, OrganizerOptions::default()).expect("start");
        organizer.execute(&op(root, "test.png", Category::Image));
        let report = organizer.finish();

        assert_eq!(report.counts.directories_created, 0);
        assert!(root.join("Images").join("test.png").exists());
    }

    #[test]
    fn test_rename_policy_picks_numeric_suffix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("Images")).expect("mkdir");
        fs::write(root.join("Images").join("x.jpg"), "old").expect("write");
        fs::write(root.join("x.jpg"), "new").expect("write");

        let mut organizer = FileOrganizer::start(root, options(DuplicatePolicy::Rename, false))
            .expect("start");
        let result = organizer.execute(&op(root, "x.jpg", Category::Image));
        assert_eq!(result.destination, root.join("Images").join("x (1).jpg"));
        organizer.finish();

        assert_eq!(
            fs::read_to_string(root.join("Images").join("x.jpg")).expect("read"),
            "old"
        );
        assert_eq!(
            fs::read_to_string(root.join("Images").join("x (1).jpg")).expect("read"),
            "new"
        );
    }

    #[test]
    fn test_dry_run_matches_live_decisions_without_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a")).expect("mkdir");
        fs::write(root.join("x.jpg"), "1").expect("write");
        fs::write(root.join("a").join("x.jpg"), "2").expect("write");

        let ops = vec![
            op(root, "x.jpg", Category::Image),
            PlannedOperation {
                source: root.join("a").join("x.jpg"),
                destination: root.join("Images").join("x.jpg"),
                category: Category::Image,
            },
        ];

        let mut organizer =
            FileOrganizer::start(root, options(DuplicatePolicy::Rename, true)).expect("start");
        organizer.execute_all(&ops);
        let report = organizer.finish();

        assert!(report.dry_run);
        assert!(report.log_path.is_none());
        assert_eq!(report.results[1].destination, root.join("Images").join("x (1).jpg"));
        assert!(root.join("x.jpg").exists());
        assert!(!root.join("Images").exists());
        assert!(!root.join(".dirtidy").exists());
    }

    #[test]
    fn test_overwrite_with_backup_is_undoable() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("Images")).expect("mkdir");
        fs::write(root.join("Images").join("x.jpg"), "old").expect("write");
        fs::write(root.join("x.jpg"), "new").expect("write");

        let mut organizer = FileOrganizer::start(root, options(DuplicatePolicy::Overwrite, false))
            .expect("start");
        let result = organizer.execute(&op(root, "x.jpg", Category::Image));
        let backup = match &result.outcome {
            Outcome::Overwritten {
                backup_path: Some(path),
                undoable: true,
            } => path.clone(),
            other => panic!("unexpected outcome {other:?}"),
        };
        let report = organizer.finish();

        assert!(report.warnings.is_empty());
        assert_eq!(fs::read_to_string(&backup).expect("read backup"), "old");
        assert_eq!(
            fs::read_to_string(root.join("Images").join("x.jpg")).expect("read"),
            "new"
        );
    }

    #[test]
    fn test_overwrite_without_backup_warns() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("Images")).expect("mkdir");
        fs::write(root.join("Images").join("x.jpg"), "old").expect("write");
        fs::write(root.join("x.jpg"), "new").expect("write");

        let mut organizer = FileOrganizer::start(
            root,
            OrganizerOptions {
                on_duplicate: DuplicatePolicy::Overwrite,
                dry_run: false,
                backup_overwritten: false,
            },
        )
        .expect("start");
        let result = organizer.execute(&op(root, "x.jpg", Category::Image));
        assert!(matches!(
            result.outcome,
            Outcome::Overwritten {
                backup_path: None,
                undoable: false
            }
        ));
        let report = organizer.finish();

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("cannot be undone"));
    }

    #[test]
    fn test_missing_source_fails_without_log_entry() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        let mut organizer =
            FileOrganizer::start(root, OrganizerOptions::default()).expect("start");
        let result = organizer.execute(&op(root, "ghost.txt", Category::Document));
        assert!(matches!(
            result.outcome,
            Outcome::Failed {
                error: OperationError::SourceMissing(_)
            }
        ));
        assert_eq!(result.sequence, None);
        let report = organizer.finish();

        let log = load_log(&report.log_path.expect("log")).expect("load");
        assert!(log.entries.is_empty());
        assert_eq!(report.counts.failed, 1);
    }

    #[test]
    fn test_failed_move_is_marked_in_log_and_run_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("blocker"), "not a directory").expect("write");
        fs::write(root.join("a.txt"), "a").expect("write");
        fs::write(root.join("b.txt"), "b").expect("write");

        let broken = PlannedOperation {
            source: root.join("a.txt"),
            destination: root.join("blocker").join("a.txt"),
            category: Category::Document,
        };

        let mut organizer =
            FileOrganizer::start(root, OrganizerOptions::default()).expect("start");
        let failed_sequence = organizer.execute(&broken).sequence;
        organizer.execute(&op(root, "b.txt", Category::Document));
        let report = organizer.finish();

        assert_eq!(report.counts.failed, 1);
        assert_eq!(report.counts.moved, 1);
        assert!(root.join("a.txt").exists());
        assert!(root.join("Documents").join("b.txt").exists());

        let log = load_log(&report.log_path.expect("log")).expect("load");
        let failed_sequence = failed_sequence.expect("move was logged");
        assert!(log.failure_for(failed_sequence).is_some());
    }

    #[test]
    fn test_unrecorded_change_is_not_applied_and_run_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").expect("write");
        fs::write(root.join("b.txt"), "b").expect("write");

        let mut organizer =
            FileOrganizer::start(root, OrganizerOptions::default()).expect("start");
        let log_path = organizer
            .log
            .as_ref()
            .map(|log| log.path().to_path_buf())
            .expect("live run has a log");

        if let Some(log) = organizer.log.as_mut() {
            log.replace_handle(fs::File::open(&log_path).expect("open read-only"));
        }
        let result = organizer.execute(&op(root, "a.txt", Category::Document));
        assert!(matches!(
            result.outcome,
            Outcome::Failed {
                error: OperationError::LogWrite(LogError::WriteFailed { .. })
            }
        ));
        assert_eq!(result.sequence, None);
        assert!(root.join("a.txt").exists());
        assert!(!root.join("Documents").exists());

        if let Some(log) = organizer.log.as_mut() {
            log.replace_handle(
                fs::OpenOptions::new()
                    .append(true)
                    .open(&log_path)
                    .expect("reopen for append"),
            );
        }
        let result = organizer.execute(&op(root, "b.txt", Category::Document));
        assert!(matches!(result.outcome, Outcome::Moved));
        let report = organizer.finish();

        assert_eq!(report.counts.failed, 1);
        assert_eq!(report.counts.moved, 1);
        assert!(root.join("Documents").join("b.txt").exists());

        let log = load_log(&log_path).expect("log stays valid");
        let sequences: Vec<_> = log.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![2, 3]);
        assert!(log.is_finalized());
    }

    #[test]
    fn test_category_counts_include_only_placed_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.jpg"), "a").expect("write");
        fs::write(root.join("b.jpg"), "b").expect("write");

        let mut organizer =
            FileOrganizer::start(root, options(DuplicatePolicy::Rename, true)).expect("start");
        organizer.execute(&op(root, "a.jpg", Category::Image));
        organizer.execute(&op(root, "b.jpg", Category::Image));
        organizer.execute(&op(root, "c.txt", Category::Document));
        let report = organizer.finish();

        let counts = report.category_counts();
        assert_eq!(counts.get("Images"), Some(&2));
        assert_eq!(counts.get("Documents"), None);
    }
}
