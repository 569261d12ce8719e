//! Plan builder: walks a directory and proposes one move per file.
//!
//! The planner only proposes `source -> destination` pairs. Duplicate
//! resolution happens later, in the execution engine, against the state of
//! the filesystem at the time each move is applied.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::CompiledFilters;
use crate::file_category::{Category, FileMapper};
use crate::transaction_log::STATE_DIR_NAME;

/// Errors raised while walking the tree.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("cannot read directory {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("error while walking {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },
}

/// A proposed move. The destination is a hint until duplicates are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: Category,
}

/// Shape of the plan.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub recursive: bool,
    /// Keep each file's sub-path below its category directory.
    pub keep_structure: bool,
    /// Put category directories under `<root>/<output_dir>`.
    pub output_dir: Option<PathBuf>,
}

/// Result of planning: operations in walk order plus subtrees that could not be read.
#[derive(Debug, Default)]
pub struct Plan {
    pub root: PathBuf,
    pub operations: Vec<PlannedOperation>,
    pub errors: Vec<PlanningError>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Builds a [`Plan`] for one root directory.
pub struct PlanBuilder<'a> {
    root: PathBuf,
    base: PathBuf,
    mapper: &'a FileMapper,
    filters: &'a CompiledFilters,
    options: PlanOptions,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(
        root: &Path,
        mapper: &'a FileMapper,
        filters: &'a CompiledFilters,
        options: PlanOptions,
    ) -> Self {
        let base = match &options.output_dir {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        };
        Self {
            root: root.to_path_buf(),
            base,
            mapper,
            filters,
            options,
        }
    }

    /// Walk the root and propose a move for every included regular file.
    ///
    /// An unreadable root is fatal. Unreadable subtrees are recorded in
    /// [`Plan::errors`] and skipped.
    pub fn build(&self) -> Result<Plan, PlanningError> {
        let meta = fs::metadata(&self.root).map_err(|source| PlanningError::Unreadable {
            path: self.root.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(PlanningError::NotADirectory(self.root.clone()));
        }
        fs::read_dir(&self.root).map_err(|source| PlanningError::Unreadable {
            path: self.root.clone(),
            source,
        })?;

        let mut plan = Plan {
            root: self.root.clone(),
            ..Default::default()
        };

        let max_depth = if self.options.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.file_type().is_dir() || self.may_descend(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(self.root.as_path()).to_path_buf();
                    warn!(path = %path.display(), error = %err, "skipping unreadable subtree");
                    plan.errors.push(PlanningError::Walk {
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(op) = self.plan_file(entry.path()) {
                plan.operations.push(op);
            }
        }

        debug!(
            root = %self.root.display(),
            operations = plan.operations.len(),
            errors = plan.errors.len(),
            "plan built"
        );
        Ok(plan)
    }

    fn plan_file(&self, path: &Path) -> Option<PlannedOperation> {
        let rel = path.strip_prefix(&self.root).ok()?;
        if !self.filters.should_include(rel) {
            debug!(path = %rel.display(), "excluded by filters");
            return None;
        }

        let file_name = path.file_name()?;
        let category = self.mapper.categorize(path);

        let mut destination = self.base.join(category.dir_name());
        if self.options.keep_structure
            && let Some(parent) = rel.parent().filter(|p| !p.as_os_str().is_empty())
        {
            destination.push(parent);
        }
        destination.push(file_name);

        if destination == path {
            return None;
        }

        Some(PlannedOperation {
            source: path.to_path_buf(),
            destination,
            category,
        })
    }

    fn may_descend(&self, entry: &DirEntry) -> bool {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();

        if name == STATE_DIR_NAME || path == self.base {
            return false;
        }
        // Category directories only exist directly under the base.
        if path.parent() == Some(self.base.as_path())
            && Category::ALL.iter().any(|c| c.dir_name() == name)
        {
            return false;
        }
        self.filters.should_descend(&name)
    }
}
