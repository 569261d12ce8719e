//! Duplicate-name resolution.
//!
//! Policy:
//! - Rename: append " (n)" before the extension, n being the smallest integer
//!   (starting at 1) whose name is free.
//! - Skip: leave the source where it is.
//! - Overwrite: replace the existing destination.
//!
//! Whether a path is "taken" is decided by the caller through a predicate, so
//! a dry run can account for destinations claimed earlier in the same run.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// What to do when the destination of a move already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Pick a free name by appending " (n)".
    #[default]
    Rename,
    /// Leave the source untouched.
    Skip,
    /// Replace the existing destination.
    Overwrite,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicatePolicy::Rename => "rename",
            DuplicatePolicy::Skip => "skip",
            DuplicatePolicy::Overwrite => "overwrite",
        })
    }
}

/// Outcome of applying a [`DuplicatePolicy`] to a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The destination is free, or was renamed to a free path.
    Use(PathBuf),
    /// The destination is taken and the policy says skip.
    Skip(PathBuf),
    /// The destination is taken and will be replaced.
    Overwrite(PathBuf),
}

impl Resolution {
    /// The path the operation targets after resolution.
    pub fn path(&self) -> &Path {
        match self {
            Resolution::Use(p) | Resolution::Skip(p) | Resolution::Overwrite(p) => p,
        }
    }
}

/// Resolve `dst` against `policy`, using `is_taken` to probe candidate paths.
pub fn resolve<F>(dst: &Path, policy: DuplicatePolicy, is_taken: F) -> Resolution
where
    F: Fn(&Path) -> bool,
{
    if !is_taken(dst) {
        return Resolution::Use(dst.to_path_buf());
    }

    match policy {
        DuplicatePolicy::Rename => Resolution::Use(unique_with_numeric_suffix(dst, is_taken)),
        DuplicatePolicy::Skip => Resolution::Skip(dst.to_path_buf()),
        DuplicatePolicy::Overwrite => Resolution::Overwrite(dst.to_path_buf()),
    }
}

/// Return the first free path of the form "stem (n).ext", n = 1, 2, ...
///
/// Examples:
/// - "movie.mkv" -> "movie (1).mkv", "movie (2).mkv", ...
/// - "Makefile" -> "Makefile (1)"
/// - "archive.tar.gz" -> "archive.tar (1).gz"
pub fn unique_with_numeric_suffix<F>(dst: &Path, is_taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let parent = dst.parent().unwrap_or_else(|| Path::new(""));
    let name = dst.file_name().unwrap_or_else(|| OsStr::new("file"));
    let base = Path::new(name);

    let stem: OsString = base
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| name.to_os_string());
    let ext: Option<&OsStr> = base.extension();

    let mut n: u64 = 1;
    loop {
        let candidate = parent.join(name_with_suffix(&stem, ext, n));
        if !is_taken(&candidate) {
            trace!(candidate = %candidate.display(), n, "duplicate: picked free name");
            return candidate;
        }
        n += 1;
    }
}

fn name_with_suffix(stem: &OsStr, ext: Option<&OsStr>, n: u64) -> OsString {
    let mut out = stem.to_os_string();
    out.push(format!(" ({n})"));
    if let Some(e) = ext {
        out.push(".");
        out.push(e);
    }
    out
}
