//! Log file discovery with early directory pruning.
//!
//! Performance notes:
//! - Excluded directories are pruned via `WalkDir::filter_entry`, so their
//!   subtrees are never visited
//! - Surviving entries are checked in parallel with Rayon's `par_bridge`

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never searched for logs.
const EXCLUDED_DIRS: &[&str] = &["target", ".git", "node_modules"];

/// Extensions of files that may hold persisted events.
pub const LOG_EXTENSIONS: &[&str] = &["json", "jsonl", "log"];

#[inline]
fn is_excluded_dir(entry: &walkdir::DirEntry, excludes: &HashSet<&str>) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.contains(name))
}

fn is_log_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| LOG_EXTENSIONS.contains(&ext))
}

/// Collect log files under `root`, sorted by path.
///
/// A `root` that is itself a file is returned as the only entry,
/// whatever its extension.
pub fn gather_log_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let excludes: HashSet<&str> = EXCLUDED_DIRS.iter().copied().collect();

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e, &excludes))
        .par_bridge()
        .filter_map(|entry| match entry {
            Ok(e) if is_log_file(e.path()) => Some(Ok(e.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(e.into())),
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Failed to gather log files from {}", root.display()))?;

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_tree(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("eventfmt_scan_{name}_{}", std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::create_dir_all(dir.join("target")).unwrap();
        fs::create_dir_all(dir.join(".git")).unwrap();
        fs::write(dir.join("app.json"), "").unwrap();
        fs::write(dir.join("nested/worker.jsonl"), "").unwrap();
        fs::write(dir.join("nested/old.log"), "").unwrap();
        fs::write(dir.join("notes.txt"), "").unwrap();
        fs::write(dir.join("target/build.json"), "").unwrap();
        fs::write(dir.join(".git/index.log"), "").unwrap();
        dir
    }

    #[test]
    fn test_gather_log_files() {
        let dir = temp_tree("gather");
        let files = gather_log_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(&dir).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["app.json", "nested/old.log", "nested/worker.jsonl"]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_root_is_returned_as_is() {
        let dir = temp_tree("single");
        let file = dir.join("notes.txt");
        assert_eq!(gather_log_files(&file).unwrap(), vec![file.clone()]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let missing = std::env::temp_dir().join("eventfmt_scan_definitely_missing_dir");
        assert!(gather_log_files(&missing).is_err());
    }
}
