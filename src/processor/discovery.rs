//! Data file discovery inside sensor folders

use crate::error::{CleanerError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Lists the export files of one sensor folder
#[derive(Debug)]
pub struct FileDiscovery {
    folder: PathBuf,
}

impl FileDiscovery {
    pub fn new(folder: &Path) -> Self {
        Self {
            folder: folder.to_path_buf(),
        }
    }

    /// Regular, non-hidden files directly inside the folder, sorted by name
    ///
    /// ```text
    /// Data/
    ///   GSR/
    ///     GSR_001.csv
    ///     GSR_002.csv
    ///   Survey/
    ///     Survey_P001.csv
    /// ```
    pub fn discover_data_files(&self) -> Result<Vec<PathBuf>> {
        if !self.folder.is_dir() {
            return Err(CleanerError::io(
                &self.folder,
                std::io::Error::new(std::io::ErrorKind::NotFound, "sensor folder not found"),
            ));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if entry.file_type().is_file() && !hidden {
                files.push(entry.into_path());
            }
        }

        debug!(
            "Found {} data files in {}",
            files.len(),
            self.folder.display()
        );
        Ok(files)
    }
}
