//! Removal of previously downloaded archives from the target directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::Reporter;

/// Deletes every non-directory entry directly inside `dir` and reports each one.
///
/// Only `dir`'s own entries are touched; symlinks are unlinked, never followed.
/// Subdirectories are left in place with a warning. Returns the removed paths
/// in the order they were deleted.
pub fn clean_dir(dir: &Path, reporter: &dyn Reporter) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))?;
    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", path.display()))?;
        if file_type.is_dir() {
            tracing::warn!(path = %path.display(), "skipping subdirectory in target dir");
            continue;
        }
        fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        reporter.removed(&path);
        removed.push(path);
    }
    Ok(removed)
}
