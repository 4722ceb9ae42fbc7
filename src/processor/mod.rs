//! Study processing pipeline.
//!
//! Orchestrates a complete run over one iMotions export: copy the import
//! tree into the working folder, classify and rename sensor folders,
//! resolve column selections and extract every data file.

pub mod discovery;
pub mod engine;

#[cfg(test)]
pub mod tests;

use self::{discovery::FileDiscovery, engine::ExtractionEngine};

use crate::classifier::{ClassificationReport, SensorClassifier};
use crate::columns::SelectionSource;
use crate::config::CleanerConfig;
use crate::constants::{DATA_DIR_NAME, RESULTS_DIR_NAME};
use crate::error::{CleanerError, Result};
use crate::models::{FileReport, RunSummary, RunWarning, SensorType};
use crate::workspace::{copy_tree, ensure_dir, remove_tree};

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Receives progress events while a study is extracted
pub trait ProgressObserver {
    fn folder_started(&mut self, _sensor: &str, _files: usize) {}

    fn file_finished(&mut self, _report: &FileReport) {}

    fn folder_finished(&mut self, _sensor: &str) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Folder layout beneath an export root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyLayout {
    pub export_root: PathBuf,
    /// Canonicalized working copy of the import tree
    pub data_dir: PathBuf,
    /// Cleaned output, one subfolder per sensor
    pub results_dir: PathBuf,
}

impl StudyLayout {
    pub fn new(export_root: &Path) -> Self {
        Self {
            export_root: export_root.to_path_buf(),
            data_dir: export_root.join(DATA_DIR_NAME),
            results_dir: export_root.join(RESULTS_DIR_NAME),
        }
    }
}

/// How the working tree was prepared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// Import tree copied; number of files
    Copied(usize),
    /// Existing working tree kept
    Reused,
}

/// Runs the cleaning pipeline for one study
#[derive(Debug)]
pub struct StudyProcessor<'a> {
    config: &'a CleanerConfig,
    layout: StudyLayout,
}

impl<'a> StudyProcessor<'a> {
    pub fn new(config: &'a CleanerConfig, export_root: &Path) -> Self {
        Self {
            config,
            layout: StudyLayout::new(export_root),
        }
    }

    pub fn layout(&self) -> &StudyLayout {
        &self.layout
    }

    /// Copy the import tree into the working folder
    ///
    /// An existing working folder is replaced when `discard` is set and
    /// reused otherwise. Any failure here aborts the run.
    pub fn prepare(&self, import_root: &Path, discard: bool) -> Result<PrepareOutcome> {
        if !import_root.is_dir() {
            return Err(CleanerError::ImportRootNotFound {
                path: import_root.to_path_buf(),
            });
        }

        let data_dir = &self.layout.data_dir;
        if data_dir.exists() {
            if !discard {
                info!("Reusing existing working tree at {}", data_dir.display());
                return Ok(PrepareOutcome::Reused);
            }
            remove_tree(data_dir)?;
        }

        ensure_dir(&self.layout.export_root)
            .map_err(|e| CleanerError::workspace(&self.layout.export_root, e.to_string()))?;
        let files = copy_tree(import_root, data_dir)?;
        Ok(PrepareOutcome::Copied(files))
    }

    /// Classify and rename the folders of the working tree
    pub fn organize(&self) -> Result<ClassificationReport> {
        self.require_data_dir()?;
        SensorClassifier::new(self.config).organize(&self.layout.data_dir)
    }

    /// Extract every file of every canonical sensor folder
    pub fn extract(
        &self,
        selection: &mut dyn SelectionSource,
        observer: &mut dyn ProgressObserver,
    ) -> Result<RunSummary> {
        let start_time = Instant::now();
        self.require_data_dir()?;
        ensure_dir(&self.layout.results_dir)?;

        let mut summary = RunSummary::new(self.layout.results_dir.clone());
        let engine = ExtractionEngine::new(self.config);
        let folders = SensorClassifier::new(self.config).sensor_folders(&self.layout.data_dir);

        for folder in folders {
            let Some(sensor) = self.config.sensor(&folder.sensor) else {
                continue;
            };

            match self.extract_folder(
                &engine,
                sensor,
                &folder.path,
                selection,
                observer,
                &mut summary,
            ) {
                Ok(true) => summary.sensors_processed += 1,
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{} skipped: {}", folder.path.display(), e);
                    summary.warnings.push(RunWarning::FolderFailed {
                        path: folder.path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Extraction complete: {} cleaned, {} copied unprocessed, {} failed",
            summary.files_cleaned, summary.files_fallback, summary.files_failed
        );
        Ok(summary)
    }

    /// Prepare, organize and extract in one pass
    pub fn run(
        &self,
        import_root: &Path,
        discard: bool,
        selection: &mut dyn SelectionSource,
        observer: &mut dyn ProgressObserver,
    ) -> Result<RunSummary> {
        let start_time = Instant::now();
        self.prepare(import_root, discard)?;
        let classification = self.organize()?;

        let mut summary = self.extract(selection, observer)?;
        let mut warnings = classification.warnings;
        warnings.append(&mut summary.warnings);
        summary.warnings = warnings;
        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Extract one sensor folder; `false` when it holds no data files
    fn extract_folder(
        &self,
        engine: &ExtractionEngine<'_>,
        sensor: &SensorType,
        folder: &Path,
        selection: &mut dyn SelectionSource,
        observer: &mut dyn ProgressObserver,
        summary: &mut RunSummary,
    ) -> Result<bool> {
        let files = FileDiscovery::new(folder).discover_data_files()?;
        if files.is_empty() {
            warn!("{} contains no data files", folder.display());
            return Ok(false);
        }

        let results_dir = self.layout.results_dir.join(&sensor.name);
        ensure_dir(&results_dir)?;

        let columns = selection.select(sensor);
        if columns.is_empty() {
            warn!(
                "No columns selected for {}, its files will be copied unprocessed",
                sensor.name
            );
        }
        info!(
            "Processing {} files in {} ({} columns selected)",
            files.len(),
            sensor.name,
            columns.columns.len()
        );

        observer.folder_started(&sensor.name, files.len());
        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let report = engine.extract(&file, &results_dir.join(name), &columns);
            observer.file_finished(&report);
            summary.record(report);
        }
        observer.folder_finished(&sensor.name);

        Ok(true)
    }

    fn require_data_dir(&self) -> Result<()> {
        if self.layout.data_dir.is_dir() {
            Ok(())
        } else {
            Err(CleanerError::workspace(
                &self.layout.data_dir,
                "working tree has not been prepared",
            ))
        }
    }
}
