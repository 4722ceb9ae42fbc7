//! iMotions Export Cleaner Library
//!
//! A Rust library for turning raw iMotions sensor exports into clean,
//! analysis-ready CSV files.
//!
//! This library provides tools for:
//! - Copying an export tree into a working folder without touching the original
//! - Classifying sensor folders (GSR, eye tracking, facial expression, heart rate, survey)
//!   and renaming folders and files to a canonical scheme
//! - Detecting where the data table starts below the metadata preamble
//! - Projecting each file onto the selected columns of its sensor
//! - Copying files that cannot be cleaned unchanged, and reporting them
//! - Scoring survey exports into a per-participant summary table

pub mod boundary;
pub mod classifier;
pub mod columns;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod processor;
pub mod survey;
pub mod workspace;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
    pub mod input;
}

// Re-export commonly used types
pub use boundary::BoundaryDetector;
pub use classifier::SensorClassifier;
pub use columns::{ColumnSelection, SelectionSource};
pub use config::CleanerConfig;
pub use error::{CleanerError, Result};
pub use models::{DataBoundary, Detection, FileReport, FileStatus, RunSummary, SensorType};
pub use processor::{StudyProcessor, engine::ExtractionEngine};
