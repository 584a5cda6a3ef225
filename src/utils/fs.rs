//! Output file helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::MIN_SUFFIX;

/// Write `contents` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// `<dir>/<stem>.min.<ext>` for a source file.
pub fn min_output(source: &Path, dir: &Path, ext: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    dir.join(format!("{stem}{MIN_SUFFIX}.{ext}"))
}

/// Mirror `path` from `from` into `to`, keeping its relative location.
pub fn mirror(path: &Path, from: &Path, to: &Path) -> Option<PathBuf> {
    path.strip_prefix(from).ok().map(|rel| to.join(rel))
}

/// Remove a directory tree; an absent directory counts as removed.
///
/// Returns whether anything was deleted.
pub fn remove_dir_all_if_exists(dir: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
