//! File relocation primitives.
//! Attempts an atomic rename; across filesystems falls back to copy into a
//! temporary sibling, rename into place, then delete the source.

use filetime::{FileTime, set_file_times};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a file ended up at its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMethod {
    Renamed,
    Copied,
}

/// Move `src` to `dst`. The parent of `dst` must already exist.
///
/// An existing `dst` is replaced.
pub fn move_file(src: &Path, dst: &Path) -> io::Result<MoveMethod> {
    match fs::rename(src, dst) {
        Ok(()) => {
            debug!(src = %src.display(), dst = %dst.display(), "renamed");
            Ok(MoveMethod::Renamed)
        }
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            warn!(src = %src.display(), dst = %dst.display(), "cross-filesystem move; copying instead");
            copy_then_remove(src, dst)?;
            Ok(MoveMethod::Copied)
        }
        Err(e) => Err(e),
    }
}

fn copy_then_remove(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)?;
    let tmp = temp_sibling(dst);

    if let Err(e) = fs::copy(src, &tmp).and_then(|_| {
        preserve_times(&tmp, &meta);
        fs::File::open(&tmp)?.sync_all()?;
        fs::rename(&tmp, dst)
    }) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::remove_file(src)
}

/// Unique hidden name next to `dst` for an in-flight copy.
fn temp_sibling(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let tag = uuid::Uuid::new_v4().simple().to_string();
    dst.with_file_name(format!(".{name}.dirtidy-{}", &tag[..8]))
}

/// Copy access and modification times. Permissions are carried by `fs::copy`.
fn preserve_times(dest: &Path, src_meta: &fs::Metadata) {
    let at = FileTime::from_last_access_time(src_meta);
    let mt = FileTime::from_last_modification_time(src_meta);
    if let Err(e) = set_file_times(dest, at, mt) {
        warn!(path = %dest.display(), error = %e, "failed to preserve timestamps");
    }
}

/// Moves used by undo must never replace an existing file.
pub fn move_file_no_clobber(src: &Path, dst: &Path) -> io::Result<MoveMethod> {
    if fs::symlink_metadata(dst).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", dst.display()),
        ));
    }
    move_file(src, dst)
}

/// True if something (file, directory or dangling symlink) is at `path`.
pub fn path_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_file_renames_within_filesystem() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src = temp_dir.path().join("a.txt");
        let dst = temp_dir.path().join("b.txt");
        fs::write(&src, "content").expect("write");

        let method = move_file(&src, &dst).expect("move");
        assert_eq!(method, MoveMethod::Renamed);
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).expect("read"), "content");
    }

    #[test]
    fn test_copy_then_remove_preserves_content_and_mtime() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src = temp_dir.path().join("a.txt");
        let dst = temp_dir.path().join("b.txt");
        fs::write(&src, "content").expect("write");
        let old = FileTime::from_unix_time(1_000_000_000, 0);
        set_file_times(&src, old, old).expect("set times");

        copy_then_remove(&src, &dst).expect("copy");

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).expect("read"), "content");
        let meta = fs::metadata(&dst).expect("stat");
        assert_eq!(FileTime::from_last_modification_time(&meta), old);
    }

    #[test]
    fn test_no_clobber_refuses_existing_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src = temp_dir.path().join("a.txt");
        let dst = temp_dir.path().join("b.txt");
        fs::write(&src, "new").expect("write");
        fs::write(&dst, "old").expect("write");

        let err = move_file_no_clobber(&src, &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dst).expect("read"), "old");
        assert!(src.exists());
    }
}
