//! Working tree utilities.
//!
//! The import tree is never modified. It is copied into the export
//! folder first and classification renames that copy in place.

use crate::error::{CleanerError, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Create a directory and its parents if missing
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| CleanerError::io(path, e))
}

/// Recursively copy `source` into `destination`, returning the number of files copied
///
/// Symbolic links are skipped. Any failure aborts the copy.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<usize> {
    if !source.is_dir() {
        return Err(CleanerError::ImportRootNotFound {
            path: source.to_path_buf(),
        });
    }
    if is_nested(source, destination) {
        return Err(CleanerError::workspace(
            destination,
            format!("destination lies inside {}", source.display()),
        ));
    }

    info!(
        "Copying {} -> {}",
        source.display(),
        destination.display()
    );
    ensure_dir(destination).map_err(|e| CleanerError::workspace(destination, e.to_string()))?;

    let mut files_copied = 0;
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| CleanerError::workspace(source, e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| CleanerError::workspace(entry.path(), e.to_string()))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| CleanerError::workspace(&target, e.to_string()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .map_err(|e| CleanerError::workspace(&target, e.to_string()))?;
            files_copied += 1;
        } else {
            debug!("Skipping {}", entry.path().display());
        }
    }

    info!("Copied {} files", files_copied);
    Ok(files_copied)
}

/// Remove a directory tree if it exists
pub fn remove_tree(path: &Path) -> Result<()> {
    if path.exists() {
        info!("Removing {}", path.display());
        fs::remove_dir_all(path).map_err(|e| CleanerError::workspace(path, e.to_string()))?;
    }
    Ok(())
}

fn is_nested(source: &Path, destination: &Path) -> bool {
    let Ok(source) = source.canonicalize() else {
        return false;
    };
    destination
        .ancestors()
        .find_map(|ancestor| ancestor.canonicalize().ok())
        .is_some_and(|existing| existing.starts_with(&source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_tree_preserves_layout() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("import");
        fs::create_dir_all(source.join("Shimmer3_GSR_P001")).unwrap();
        fs::create_dir_all(source.join("empty")).unwrap();
        fs::write(source.join("Shimmer3_GSR_P001").join("gsr_data_001.csv"), "a,b\n").unwrap();
        fs::write(source.join("study.txt"), "pilot").unwrap();

        let destination = temp_dir.path().join("export").join("Data");
        let copied = copy_tree(&source, &destination).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(destination.join("Shimmer3_GSR_P001").join("gsr_data_001.csv"))
                .unwrap(),
            "a,b\n"
        );
        assert!(destination.join("empty").is_dir());
        assert!(source.join("study.txt").exists());
    }

    #[test]
    fn test_copy_tree_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = copy_tree(&temp_dir.path().join("nope"), &temp_dir.path().join("Data"));
        assert!(matches!(result, Err(CleanerError::ImportRootNotFound { .. })));
    }

    #[test]
    fn test_copy_tree_rejects_nested_destination() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("import");
        fs::create_dir_all(&source).unwrap();

        let result = copy_tree(&source, &source.join("Exports").join("Data"));
        assert!(matches!(result, Err(CleanerError::Workspace { .. })));
    }

    #[test]
    fn test_remove_tree() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("Data");
        fs::create_dir_all(target.join("GSR")).unwrap();

        remove_tree(&target).unwrap();
        assert!(!target.exists());
        remove_tree(&target).unwrap();
    }
}
