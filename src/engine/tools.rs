//! Path utilities: input discovery and completion marking

use anyhow::{Context, Result};
use glob::MatchOptions;
use std::path::{Path, PathBuf};

/// Files matching `pattern`, sorted. Dot-prefixed names never match a wildcard, so files already
/// marked done are skipped. Unreadable entries are logged and skipped.
pub fn discover_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let mut files = Vec::new();
    for entry in glob::glob_with(pattern, options)
        .with_context(|| format!("invalid input pattern `{pattern}`"))?
    {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Cannot read {}: {}", e.path().display(), e.error()),
        }
    }
    files.sort();
    Ok(files)
}

/// `dir/name` -> `dir/<prefix>name`.
pub fn marked_path_for(path: &Path, prefix: &str) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("no file name in {}", path.display()))?;
    Ok(path.with_file_name(format!("{prefix}{name}")))
}

/// Rename `path` in place with `prefix`. Same directory, so the rename is atomic on POSIX
/// filesystems: a concurrent scan sees either the old name or the marked one.
pub fn mark_file(path: &Path, prefix: &str) -> Result<PathBuf> {
    let marked = marked_path_for(path, prefix)?;
    std::fs::rename(path, &marked).with_context(|| {
        format!(
            "atomic rename to completion marker ({} -> {})",
            path.display(),
            marked.display()
        )
    })?;
    Ok(marked)
}
