//! dirtidy - A directory organization and cleanup utility
//!
//! This library sorts the files of a directory into category folders and
//! records every change in a per-run transaction log, so a run can be
//! previewed with a dry run and reversed later with `undo`. Filtering rules,
//! organize defaults and category overrides come from TOML configuration files.
//!
//! Running two organize or undo commands against the same directory at the
//! same time is not supported; there is no locking.

pub mod cli;
pub mod config;
pub mod duplicate;
pub mod file_category;
pub mod file_organizer;
pub mod fs_move;
pub mod logging;
pub mod output;
pub mod planner;
pub mod transaction_log;
pub mod undo;

pub use config::{CompiledFilters, Config, ConfigError};
pub use duplicate::DuplicatePolicy;
pub use file_category::{Category, FileMapper};
pub use file_organizer::{FileOrganizer, OperationError, OperationResult, OrganizerOptions, RunReport};
pub use planner::{Plan, PlanBuilder, PlanOptions, PlannedOperation, PlanningError};
pub use transaction_log::{LogError, LogStore};
pub use undo::{UndoEntryError, UndoManager, UndoOutcome, UndoReport};

pub use cli::{Cli, run_cli};
