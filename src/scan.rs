//! Source file discovery.
//!
//! A thin wrapper over the `ignore` walker: honors `.gitignore`, applies
//! the configured exclude globs, and filters by extension. Walk errors
//! (permission denied, broken symlinks) are logged and skipped rather than
//! failing the whole analysis.

use std::path::{Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::error::{Result, SimscanError};

/// Find analyzable files under `root`.
///
/// `extensions` are matched with their leading dot (".py"); an empty list
/// matches nothing. `exclude_patterns` are gitignore-style globs. The
/// result is sorted so downstream file-id assignment is deterministic.
pub fn find_files(
    root: &Path,
    extensions: &[String],
    exclude_patterns: &[String],
) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(SimscanError::PathNotFound(root.to_path_buf()));
    }

    let mut overrides = OverrideBuilder::new(root);
    for pattern in exclude_patterns {
        // Overrides use whitelist semantics; a leading `!` excludes.
        overrides.add(&format!("!{pattern}"))?;
    }
    let overrides = overrides.build()?;

    let walker = WalkBuilder::new(root)
        .overrides(overrides)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if matches_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!(count = files.len(), root = %root.display(), "file discovery complete");
    Ok(files)
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|e| e.strip_prefix('.').unwrap_or(e) == ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x = 1\n").unwrap();
    }

    #[test]
    fn test_extension_filter() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.py");
        touch(dir.path(), "b.js");
        touch(dir.path(), "c.txt");

        let files = find_files(dir.path(), &[".py".to_string()], &[]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.py"));
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/a.py");
        touch(dir.path(), "venv/lib/b.py");

        let files = find_files(
            dir.path(),
            &[".py".to_string()],
            &["**/venv/**".to_string()],
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.py"));
    }

    #[test]
    fn test_result_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "z.py");
        touch(dir.path(), "a.py");
        touch(dir.path(), "m.py");

        let files = find_files(dir.path(), &[".py".to_string()], &[]).unwrap();
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn test_missing_root_is_error() {
        let result = find_files(Path::new("/nonexistent/simscan"), &[".py".to_string()], &[]);
        assert!(matches!(result, Err(SimscanError::PathNotFound(_))));
    }

    #[test]
    fn test_no_extension_files_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Makefile");
        let files = find_files(dir.path(), &[".py".to_string()], &[]).unwrap();
        assert!(files.is_empty());
    }
}
