//! Core data structures and types for export cleaning.
//!
//! Defines sensor types, detected data boundaries, per-file extraction
//! outcomes and the run summary used throughout the library.

use crate::constants::derived_prefix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One instrument class from the sensor table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorType {
    /// Canonical folder name, e.g. `GSR`
    pub name: String,
    /// Substrings that identify a raw export folder as this sensor
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Ordered canonical output columns
    #[serde(default)]
    pub columns: Vec<String>,
    /// File name prefix; derived from `name` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl SensorType {
    pub fn new(name: &str, keywords: &[&str], columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    /// Prefix used when renaming this sensor's data files
    pub fn file_prefix(&self) -> String {
        self.prefix
            .clone()
            .unwrap_or_else(|| derived_prefix(&self.name))
    }

    /// Whether any keyword occurs in the folder name
    pub fn matches_keyword(&self, folder_name: &str, case_sensitive: bool) -> bool {
        let folder = if case_sensitive {
            folder_name.to_string()
        } else {
            folder_name.to_lowercase()
        };

        self.keywords
            .iter()
            .filter(|keyword| !keyword.is_empty())
            .any(|keyword| {
                if case_sensitive {
                    folder.contains(keyword.as_str())
                } else {
                    folder.contains(&keyword.to_lowercase())
                }
            })
    }

    /// Whether the folder already carries this sensor's canonical name
    pub fn is_canonical_name(&self, folder_name: &str) -> bool {
        folder_name == self.name
    }
}

/// Where tabular data begins inside an export file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBoundary {
    /// Zero-based row holding the marker token
    pub marker_row: usize,
    /// Marker token that matched
    pub marker: String,
    /// Zero-based row of the first body row
    pub data_start: usize,
    /// Rows must be split without quote handling (mis-delimited file)
    #[serde(default)]
    pub forced_split: bool,
}

impl DataBoundary {
    /// Row holding the column header, directly above the body
    pub fn header_row(&self) -> Option<usize> {
        self.data_start.checked_sub(1)
    }
}

/// Why no boundary could be detected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotFoundReason {
    FileMissing,
    Empty,
    Unreadable { reason: String },
    Malformed { reason: String },
    NoMarker { scanned_rows: usize },
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileMissing => write!(f, "file not found"),
            Self::Empty => write!(f, "file is empty"),
            Self::Unreadable { reason } => write!(f, "file could not be read: {}", reason),
            Self::Malformed { reason } => write!(f, "file is malformed: {}", reason),
            Self::NoMarker { scanned_rows } => {
                write!(f, "no data marker in the first {} rows", scanned_rows)
            }
        }
    }
}

/// Outcome of boundary detection. "Not found" is an expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Detection {
    Found(DataBoundary),
    NotFound(NotFoundReason),
}

impl Detection {
    pub fn boundary(&self) -> Option<&DataBoundary> {
        match self {
            Self::Found(boundary) => Some(boundary),
            Self::NotFound(_) => None,
        }
    }

    /// Index of the first body row, if found
    pub fn data_start(&self) -> Option<usize> {
        self.boundary().map(|b| b.data_start)
    }
}

/// Why a file was copied verbatim instead of cleaned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    BoundaryNotFound { reason: NotFoundReason },
    NoColumnOverlap { header_row: Option<usize> },
    ParseFailure { message: String },
    OutputWrite { message: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundaryNotFound { reason } => write!(f, "boundary not found ({})", reason),
            Self::NoColumnOverlap {
                header_row: Some(row),
            } => write!(f, "no requested column in header row {}", row),
            Self::NoColumnOverlap { header_row: None } => {
                write!(f, "no header row above the detected boundary")
            }
            Self::ParseFailure { message } => write!(f, "parse failure ({})", message),
            Self::OutputWrite { message } => write!(f, "cleaned output not written ({})", message),
        }
    }
}

/// Final state of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Column-projected output written
    Cleaned,
    /// Source copied byte-for-byte to the results path
    FallbackCopied { reason: FallbackReason },
    /// Not even the fallback copy could be written
    Failed { message: String },
}

impl FileStatus {
    pub fn is_cleaned(&self) -> bool {
        matches!(self, Self::Cleaned)
    }
}

/// Extraction result for one data file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub sensor: String,
    pub status: FileStatus,
    /// Attempts used, at most [`crate::constants::MAX_ATTEMPTS`]
    pub attempts: usize,
    pub boundary: Option<DataBoundary>,
    pub columns: Vec<String>,
    pub rows_written: usize,
}

/// Something an operator should look at after a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    UnrecognizedFolder { path: PathBuf },
    RenameSkipped { path: PathBuf, reason: String },
    FallbackCopy { path: PathBuf, reason: FallbackReason },
    FileFailed { path: PathBuf, message: String },
    FolderFailed { path: PathBuf, reason: String },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedFolder { path } => {
                write!(f, "{} not recognized or already created", path.display())
            }
            Self::RenameSkipped { path, reason } => {
                write!(f, "{} not renamed: {}", path.display(), reason)
            }
            Self::FallbackCopy { path, reason } => {
                write!(f, "{} copied unprocessed: {}", path.display(), reason)
            }
            Self::FileFailed { path, message } => {
                write!(f, "{} failed: {}", path.display(), message)
            }
            Self::FolderFailed { path, reason } => {
                write!(f, "{} skipped: {}", path.display(), reason)
            }
        }
    }
}

/// Processing statistics and warnings for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub results_dir: PathBuf,
    pub sensors_processed: usize,
    pub files_cleaned: usize,
    pub files_fallback: usize,
    pub files_failed: usize,
    pub rows_written: usize,
    pub warnings: Vec<RunWarning>,
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn new(results_dir: PathBuf) -> Self {
        Self {
            started_at: Utc::now(),
            elapsed_ms: 0,
            results_dir,
            sensors_processed: 0,
            files_cleaned: 0,
            files_fallback: 0,
            files_failed: 0,
            rows_written: 0,
            warnings: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Fold one file report into the totals
    pub fn record(&mut self, report: FileReport) {
        match &report.status {
            FileStatus::Cleaned => {
                self.files_cleaned += 1;
                self.rows_written += report.rows_written;
            }
            FileStatus::FallbackCopied { reason } => {
                self.files_fallback += 1;
                self.warnings.push(RunWarning::FallbackCopy {
                    path: report.source.clone(),
                    reason: reason.clone(),
                });
            }
            FileStatus::Failed { message } => {
                self.files_failed += 1;
                self.warnings.push(RunWarning::FileFailed {
                    path: report.source.clone(),
                    message: message.clone(),
                });
            }
        }
        self.files.push(report);
    }

    pub fn total_files(&self) -> usize {
        self.files_cleaned + self.files_fallback + self.files_failed
    }

    /// Files that need manual attention
    pub fn unprocessed_files(&self) -> Vec<&FileReport> {
        self.files
            .iter()
            .filter(|report| !report.status.is_cleaned())
            .collect()
    }
}
