//! Error handling for export cleaning operations.
//!
//! Only run-level failures are errors. File-level problems (missing
//! markers, ragged rows, absent columns) are reported as outcomes on the
//! per-file report instead, so one bad export never stops its siblings.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Import root not found at path: {path}")]
    ImportRootNotFound { path: PathBuf },

    #[error("Working tree preparation failed at {path}: {reason}")]
    Workspace { path: PathBuf, reason: String },

    #[error("Directory traversal failed: {0}")]
    Traversal(#[from] walkdir::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid survey file {path}: {reason}")]
    SurveyFormat { path: PathBuf, reason: String },
}

impl CleanerError {
    /// Attach the offending path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn workspace(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Workspace {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn survey_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SurveyFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error must abort the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ImportRootNotFound { .. }
                | Self::Workspace { .. }
                | Self::Configuration { .. }
                | Self::ConfigParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CleanerError>;
