//! Durable, append-only record of the filesystem changes made by one run.
//!
//! Each run writes one newline-delimited JSON file under
//! `<root>/.dirtidy/logs/<run_id>.jsonl`. Every line is a record tagged by
//! `record`:
//!
//! ```text
//! {"record":"begin","run_id":"20261016T101500Z-1a2b3c4d","root":"/data","started_at":"...","on_duplicate":"rename","format":1}
//! {"record":"entry","sequence":1,"timestamp":"...","action_taken":{"type":"created_directory","path":"/data/Images"}}
//! {"record":"entry","sequence":2,"timestamp":"...","action_taken":{"type":"moved","original_source_path":"/data/x.jpg","final_destination_path":"/data/Images/x.jpg","category":"Images"}}
//! {"record":"failed","sequence":2,"reason":"...","timestamp":"..."}
//! {"record":"end","finished_at":"...","counts":{...}}
//! ```
//!
//! An entry is synced to disk before the change it describes is made. A
//! change that fails afterwards gets a `failed` record; entries are never
//! rewritten or removed. Once `undo` has reversed a log it is renamed to
//! `<run_id>.undone.jsonl`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::duplicate::DuplicatePolicy;

/// Version written into the `begin` record.
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Name of the per-root state directory.
pub const STATE_DIR_NAME: &str = ".dirtidy";

const LOG_EXTENSION: &str = "jsonl";
const CONSUMED_SUFFIX: &str = ".undone.jsonl";

/// Errors raised by the transaction log.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to write transaction log {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transaction log not found: {0}")]
    NotFound(String),

    #[error("transaction log {path} was already undone")]
    AlreadyConsumed { path: PathBuf },

    #[error("failed to read transaction log {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transaction log {path} is corrupt at line {line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("sequence number {got} does not follow {last}")]
    OutOfOrder { last: u64, got: u64 },
}

/// What a log entry records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionTaken {
    /// A file was moved to its category directory.
    Moved {
        original_source_path: PathBuf,
        final_destination_path: PathBuf,
        category: String,
    },
    /// A file replaced an existing destination. `backup_path` holds the
    /// previous content when it was preserved.
    Overwritten {
        original_source_path: PathBuf,
        final_destination_path: PathBuf,
        category: String,
        backup_path: Option<PathBuf>,
    },
    /// The destination existed and the file was left in place.
    Skipped {
        original_source_path: PathBuf,
        final_destination_path: PathBuf,
    },
    /// A destination directory that did not exist was created.
    CreatedDirectory { path: PathBuf },
}

impl ActionTaken {
    /// Short machine-readable name of the action.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionTaken::Moved { .. } => "moved",
            ActionTaken::Overwritten { .. } => "overwritten",
            ActionTaken::Skipped { .. } => "skipped",
            ActionTaken::CreatedDirectory { .. } => "created_directory",
        }
    }

    /// Where the file was before the run, for file actions.
    pub fn original_source_path(&self) -> Option<&Path> {
        match self {
            ActionTaken::Moved {
                original_source_path,
                ..
            }
            | ActionTaken::Overwritten {
                original_source_path,
                ..
            }
            | ActionTaken::Skipped {
                original_source_path,
                ..
            } => Some(original_source_path),
            ActionTaken::CreatedDirectory { .. } => None,
        }
    }

    /// The path the entry ended up touching.
    pub fn final_path(&self) -> &Path {
        match self {
            ActionTaken::Moved {
                final_destination_path,
                ..
            }
            | ActionTaken::Overwritten {
                final_destination_path,
                ..
            }
            | ActionTaken::Skipped {
                final_destination_path,
                ..
            } => final_destination_path,
            ActionTaken::CreatedDirectory { path } => path,
        }
    }
}

/// One immutable record of an applied change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub action_taken: ActionTaken,
}

impl LogEntry {
    pub fn new(sequence: u64, action_taken: ActionTaken) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            action_taken,
        }
    }
}

/// Identity of a run, written as the first line of its log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHeader {
    pub run_id: String,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub on_duplicate: DuplicatePolicy,
    pub format: u32,
}

impl RunHeader {
    pub fn new(run_id: String, root: PathBuf, on_duplicate: DuplicatePolicy) -> Self {
        Self {
            run_id,
            root,
            started_at: Utc::now(),
            on_duplicate,
            format: LOG_FORMAT_VERSION,
        }
    }
}

/// Aggregate counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub moved: usize,
    pub skipped: usize,
    pub overwritten: usize,
    pub failed: usize,
    pub directories_created: usize,
}

/// Trailer written by [`TransactionLog::finalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEnd {
    pub finished_at: DateTime<Utc>,
    pub counts: RunCounts,
}

/// A single line of the log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum LogRecord {
    Begin(RunHeader),
    Entry(LogEntry),
    Failed {
        sequence: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    End(RunEnd),
}

/// Generate a sortable, collision-free run identifier.
pub fn new_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%SZ"), &uuid[..8])
}

/// Locates the logs and backups belonging to one organized root.
#[derive(Debug, Clone)]
pub struct LogStore {
    state_dir: PathBuf,
}

impl LogStore {
    /// Store kept inside `root/.dirtidy`.
    pub fn for_root(root: &Path) -> Self {
        Self {
            state_dir: root.join(STATE_DIR_NAME),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    /// Directory that receives overwritten files of one run.
    pub fn backups_dir(&self, run_id: &str) -> PathBuf {
        self.state_dir.join("backups").join(run_id)
    }

    pub fn log_path(&self, run_id: &str) -> PathBuf {
        self.logs_dir().join(format!("{run_id}.{LOG_EXTENSION}"))
    }

    /// Start a new log for `header.run_id`.
    pub fn create(&self, header: RunHeader) -> Result<TransactionLog, LogError> {
        TransactionLog::create(self.log_path(&header.run_id), header)
    }

    /// Map a run id or a path to the log file it names.
    ///
    /// Anything that exists as a file, or that looks like a path, is taken
    /// literally; otherwise it is treated as a run id inside this store.
    pub fn resolve(&self, identifier: &str) -> PathBuf {
        let as_path = Path::new(identifier);
        if as_path.is_file() || as_path.components().count() > 1 {
            return as_path.to_path_buf();
        }
        let run_id = identifier
            .strip_suffix(CONSUMED_SUFFIX)
            .or_else(|| identifier.strip_suffix(".jsonl"))
            .unwrap_or(identifier);
        self.log_path(run_id)
    }

    /// Load and validate the log named by `identifier`.
    pub fn load(&self, identifier: &str) -> Result<LoadedLog, LogError> {
        let path = self.resolve(identifier);
        if is_consumed(&path) {
            return Err(LogError::AlreadyConsumed { path });
        }
        if !path.exists() {
            let consumed = consumed_path(&path);
            if consumed.exists() {
                return Err(LogError::AlreadyConsumed { path: consumed });
            }
            return Err(LogError::NotFound(identifier.to_string()));
        }
        load_log(&path)
    }

    /// Archive a log so it cannot be undone again. Returns the new path.
    pub fn consume(&self, log: &LoadedLog) -> Result<PathBuf, LogError> {
        let target = consumed_path(&log.path);
        fs::rename(&log.path, &target).map_err(|e| LogError::WriteFailed {
            path: target.clone(),
            source: e,
        })?;
        debug!(from = %log.path.display(), to = %target.display(), "archived transaction log");
        Ok(target)
    }

    /// All logs in this store, oldest first. Unreadable logs are skipped.
    pub fn list(&self) -> Result<Vec<LogSummary>, LogError> {
        let dir = self.logs_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogError::ReadFailed { path: dir, source: e }),
        };

        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".jsonl") {
                continue;
            }
            match load_log(&path) {
                Ok(log) => summaries.push(LogSummary {
                    consumed: name.ends_with(CONSUMED_SUFFIX),
                    run_id: log.header.run_id.clone(),
                    started_at: log.header.started_at,
                    entries: log.entries.len(),
                    finalized: log.end.is_some(),
                    path,
                }),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable log"),
            }
        }
        summaries.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(summaries)
    }
}

fn is_consumed(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(CONSUMED_SUFFIX))
}

fn consumed_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name.strip_suffix(".jsonl").unwrap_or(&name);
    path.with_file_name(format!("{stem}{CONSUMED_SUFFIX}"))
}

/// Short description of a stored log, used by `history`.
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub run_id: String,
    pub path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub entries: usize,
    pub finalized: bool,
    pub consumed: bool,
}

/// Open, append-only log of the current run.
///
/// Dropping it without calling [`finalize`](Self::finalize) leaves a valid
/// log without an `end` record, which is how an interrupted run looks.
pub struct TransactionLog {
    path: PathBuf,
    file: File,
    run_id: String,
    last_sequence: u64,
}

impl TransactionLog {
    fn create(path: PathBuf, header: RunHeader) -> Result<Self, LogError> {
        let write_err = |source| LogError::WriteFailed {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .map_err(write_err)?;

        let mut log = Self {
            run_id: header.run_id.clone(),
            path,
            file,
            last_sequence: 0,
        };
        log.write_record(&LogRecord::Begin(header))?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Durably append one entry. Sequence numbers must strictly increase.
    pub fn append(&mut self, entry: &LogEntry) -> Result<(), LogError> {
        if entry.sequence <= self.last_sequence {
            return Err(LogError::OutOfOrder {
                last: self.last_sequence,
                got: entry.sequence,
            });
        }
        // A failed write still uses up the number.
        self.last_sequence = entry.sequence;
        self.write_record(&LogRecord::Entry(entry.clone()))
    }

    /// Record that the change described by entry `sequence` did not happen.
    pub fn mark_failed(&mut self, sequence: u64, reason: &str) -> Result<(), LogError> {
        self.write_record(&LogRecord::Failed {
            sequence,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Write the trailer and close the log.
    pub fn finalize(mut self, counts: RunCounts) -> Result<PathBuf, LogError> {
        self.write_record(&LogRecord::End(RunEnd {
            finished_at: Utc::now(),
            counts,
        }))?;
        Ok(self.path)
    }

    fn write_record(&mut self, record: &LogRecord) -> Result<(), LogError> {
        let mut line = serde_json::to_string(record).map_err(|e| LogError::WriteFailed {
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        line.push('\n');

        let len_before = self.file.metadata().map(|m| m.len());
        if let Err(e) = self
            .file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.sync_all())
        {
            // Drop whatever part of the record reached the file.
            match len_before {
                Ok(len) => {
                    if let Err(trunc) = self.file.set_len(len) {
                        warn!(path = %self.path.display(), error = %trunc, "could not roll back partial log record");
                    }
                }
                Err(meta) => {
                    warn!(path = %self.path.display(), error = %meta, "could not roll back partial log record");
                }
            }
            return Err(LogError::WriteFailed {
                path: self.path.clone(),
                source: e,
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn replace_handle(&mut self, file: File) {
        self.file = file;
    }
}

/// A validated log read back from disk.
#[derive(Debug, Clone)]
pub struct LoadedLog {
    pub path: PathBuf,
    pub header: RunHeader,
    /// Entries in ascending sequence order.
    pub entries: Vec<LogEntry>,
    /// Failure reasons keyed by entry sequence.
    pub failures: BTreeMap<u64, String>,
    pub end: Option<RunEnd>,
}

impl LoadedLog {
    pub fn failure_for(&self, sequence: u64) -> Option<&str> {
        self.failures.get(&sequence).map(String::as_str)
    }

    pub fn is_finalized(&self) -> bool {
        self.end.is_some()
    }
}

/// Read and validate a log file.
pub fn load_log(path: &Path) -> Result<LoadedLog, LogError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            LogError::NotFound(path.display().to_string())
        } else {
            LogError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    parse_log(path, &content)
}

fn parse_log(path: &Path, content: &str) -> Result<LoadedLog, LogError> {
    let corrupt = |line: usize, reason: String| LogError::Corrupt {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let lines: Vec<&str> = content.lines().collect();
    let torn_tail = !content.is_empty() && !content.ends_with('\n');

    let mut header: Option<RunHeader> = None;
    let mut entries: Vec<LogEntry> = Vec::new();
    let mut failures = BTreeMap::new();
    let mut seen = HashSet::new();
    let mut end: Option<RunEnd> = None;

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let record: LogRecord = match serde_json::from_str(raw) {
            Ok(record) => record,
            Err(e) if torn_tail && idx + 1 == lines.len() => {
                warn!(path = %path.display(), line = line_no, error = %e, "ignoring incomplete last line of transaction log");
                break;
            }
            Err(e) => return Err(corrupt(line_no, format!("malformed record: {e}"))),
        };

        if end.is_some() {
            return Err(corrupt(line_no, "record after end of run".to_string()));
        }

        match record {
            LogRecord::Begin(h) => {
                if header.is_some() {
                    return Err(corrupt(line_no, "duplicate begin record".to_string()));
                }
                header = Some(h);
            }
            _ if header.is_none() => {
                return Err(corrupt(line_no, "log does not start with a begin record".to_string()));
            }
            LogRecord::Entry(entry) => {
                if let Some(last) = entries.last() {
                    if entry.sequence == last.sequence {
                        return Err(corrupt(
                            line_no,
                            format!("duplicate sequence number {}", entry.sequence),
                        ));
                    }
                    if entry.sequence < last.sequence {
                        return Err(corrupt(
                            line_no,
                            format!(
                                "sequence number {} after {}",
                                entry.sequence, last.sequence
                            ),
                        ));
                    }
                }
                seen.insert(entry.sequence);
                entries.push(entry);
            }
            LogRecord::Failed {
                sequence, reason, ..
            } => {
                if !seen.contains(&sequence) {
                    return Err(corrupt(
                        line_no,
                        format!("failure recorded for unknown sequence {sequence}"),
                    ));
                }
                failures.insert(sequence, reason);
            }
            LogRecord::End(e) => end = Some(e),
        }
    }

    let header = header.ok_or_else(|| corrupt(0, "empty log".to_string()))?;

    Ok(LoadedLog {
        path: path.to_path_buf(),
        header,
        entries,
        failures,
        end,
    })
}
