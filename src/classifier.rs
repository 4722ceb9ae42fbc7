//! Sensor folder classification and canonical renaming.
//!
//! Raw export folders are named after the recording device and
//! participant (`Shimmer3_GSR_P001`). Classification maps them onto the
//! configured sensor types and renames folders and files to a stable
//! scheme so later stages can address them by sensor name.

use crate::config::CleanerConfig;
use crate::constants::{SURVEY_FILE_EXTENSION, SURVEY_FILE_PREFIX};
use crate::error::{CleanerError, Result};
use crate::models::{RunWarning, SensorType};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of matching one folder name against the sensor table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Recognized(&'a SensorType),
    Unrecognized,
}

impl<'a> Classification<'a> {
    pub fn sensor(&self) -> Option<&'a SensorType> {
        match self {
            Self::Recognized(sensor) => Some(sensor),
            Self::Unrecognized => None,
        }
    }
}

/// A folder carrying a sensor's canonical name after organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorFolder {
    pub sensor: String,
    pub path: PathBuf,
}

/// What one organization pass did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassificationReport {
    pub sensor_folders: Vec<SensorFolder>,
    pub folders_renamed: usize,
    pub files_renamed: usize,
    pub warnings: Vec<RunWarning>,
}

/// Maps export folder names onto sensor types
#[derive(Debug, Clone, Copy)]
pub struct SensorClassifier<'a> {
    sensors: &'a [SensorType],
    case_sensitive: bool,
}

impl<'a> SensorClassifier<'a> {
    pub fn new(config: &'a CleanerConfig) -> Self {
        Self {
            sensors: &config.sensors,
            case_sensitive: config.classification.case_sensitive,
        }
    }

    /// First sensor in table order whose canonical name or keywords match
    pub fn classify(&self, folder_name: &str) -> Classification<'a> {
        if let Some(sensor) = self
            .sensors
            .iter()
            .find(|sensor| sensor.is_canonical_name(folder_name))
        {
            return Classification::Recognized(sensor);
        }

        self.sensors
            .iter()
            .find(|sensor| sensor.matches_keyword(folder_name, self.case_sensitive))
            .map_or(Classification::Unrecognized, Classification::Recognized)
    }

    /// Rename recognized folders and their files in place
    pub fn organize(&self, data_dir: &Path) -> Result<ClassificationReport> {
        info!("Organizing sensor folders in {}", data_dir.display());
        let mut report = ClassificationReport::default();

        for folder in sorted_entries(data_dir)?
            .into_iter()
            .filter(|path| path.is_dir())
        {
            let folder_name = file_name(&folder);

            let Some(sensor) = self.classify(&folder_name).sensor() else {
                warn!("{} not recognized or already created", folder.display());
                report
                    .warnings
                    .push(RunWarning::UnrecognizedFolder { path: folder });
                continue;
            };

            let target = data_dir.join(&sensor.name);
            if folder != target {
                if target.exists() {
                    let reason = format!("{} already exists", target.display());
                    warn!("{} not renamed: {}", folder.display(), reason);
                    report
                        .warnings
                        .push(RunWarning::RenameSkipped { path: folder, reason });
                    continue;
                }

                if let Err(e) = fs::rename(&folder, &target) {
                    warn!("{} not renamed: {}", folder.display(), e);
                    report.warnings.push(RunWarning::RenameSkipped {
                        path: folder,
                        reason: e.to_string(),
                    });
                    continue;
                }
                info!("Renamed {} -> {}", folder_name, sensor.name);
                report.folders_renamed += 1;
            }

            match rename_files(&target, sensor, &mut report.warnings) {
                Ok(renamed) => report.files_renamed += renamed,
                Err(e) => {
                    warn!("Files in {} not renamed: {}", target.display(), e);
                    report.warnings.push(RunWarning::FolderFailed {
                        path: target.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            report.sensor_folders.push(SensorFolder {
                sensor: sensor.name.clone(),
                path: target,
            });
        }

        info!(
            "Organized {} sensor folders ({} folders, {} files renamed, {} warnings)",
            report.sensor_folders.len(),
            report.folders_renamed,
            report.files_renamed,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Canonical sensor folders present under `data_dir`, in table order
    pub fn sensor_folders(&self, data_dir: &Path) -> Vec<SensorFolder> {
        self.sensors
            .iter()
            .map(|sensor| SensorFolder {
                sensor: sensor.name.clone(),
                path: data_dir.join(&sensor.name),
            })
            .filter(|folder| folder.path.is_dir())
            .collect()
    }
}

fn rename_files(
    folder: &Path,
    sensor: &SensorType,
    warnings: &mut Vec<RunWarning>,
) -> Result<usize> {
    let mut renamed = 0;

    for file in sorted_entries(folder)?
        .into_iter()
        .filter(|path| path.is_file())
    {
        let name = file_name(&file);
        if name.starts_with('.') || is_canonical_file_name(&name, sensor) {
            continue;
        }

        let target = folder.join(canonical_file_name(&name, sensor));
        if target == file {
            continue;
        }
        if target.exists() {
            let reason = format!("{} already exists", target.display());
            warn!("{} not renamed: {}", file.display(), reason);
            warnings.push(RunWarning::RenameSkipped { path: file, reason });
            continue;
        }

        match fs::rename(&file, &target) {
            Ok(()) => {
                debug!("Renamed {} -> {}", name, file_name(&target));
                renamed += 1;
            }
            Err(e) => {
                warn!("{} not renamed: {}", file.display(), e);
                warnings.push(RunWarning::RenameSkipped {
                    path: file,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(renamed)
}

/// Canonical name for a data file of `sensor`
///
/// The stem is split on `_` and empty tokens are ignored. When the last
/// token is purely alphabetic the file is a survey or metadata export and
/// becomes `Survey_<first token>.csv`. Anything else becomes
/// `<prefix>_<last token><extension>`. A stem without tokens keeps its name.
pub fn canonical_file_name(file_name: &str, sensor: &SensorType) -> String {
    let (stem, extension) = split_extension(file_name);
    let mut tokens = stem.split('_').filter(|token| !token.is_empty());
    let Some(first) = tokens.next() else {
        return file_name.to_string();
    };
    let last = tokens.last().unwrap_or(first);

    if last.chars().all(char::is_alphabetic) {
        format!("{}_{}.{}", SURVEY_FILE_PREFIX, first, SURVEY_FILE_EXTENSION)
    } else {
        format!("{}_{}{}", sensor.file_prefix(), last, extension)
    }
}

/// Whether the name is already `Survey_<x>` or `<prefix>_<x>` with a single token after the prefix
pub fn is_canonical_file_name(file_name: &str, sensor: &SensorType) -> bool {
    let (stem, _) = split_extension(file_name);
    match stem.split_once('_') {
        Some((prefix, rest)) => {
            !rest.is_empty()
                && !rest.contains('_')
                && (prefix == SURVEY_FILE_PREFIX || prefix == sensor.file_prefix())
        }
        None => false,
    }
}

/// Split `name.ext` into `("name", ".ext")`; dotfiles have no extension
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(idx) => file_name.split_at(idx),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| CleanerError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| CleanerError::io(dir, e))?;
    entries.sort();
    Ok(entries)
}
