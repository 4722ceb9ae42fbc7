//! Application constants for the export cleaner
//!
//! Default values, directory names and marker conventions used
//! throughout the pipeline. Anything an operator may want to tune lives
//! in [`crate::config`] and only takes its default from here.

// =============================================================================
// Working Tree Layout
// =============================================================================

/// Directory under the export root holding the canonicalized import copy
pub const DATA_DIR_NAME: &str = "Data";

/// Directory under the export root holding extraction output
pub const RESULTS_DIR_NAME: &str = "Results";

/// Suffix appended to the study name to form the export folder
pub const EXPORT_FOLDER_SUFFIX: &str = "_Exports";

/// Study name used when the operator leaves the prompt empty
pub const DEFAULT_STUDY_NAME: &str = "iMotions";

/// Application folder under the user configuration directory
pub const CONFIG_DIR_NAME: &str = "imotions-cleaner";

/// Configuration file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

// =============================================================================
// Import Root Discovery
// =============================================================================

/// Keyword a directory name must contain to be offered as an import root
pub const IMPORT_DIR_KEYWORD: &str = "results";

/// Directory names (lower-cased substrings) never descended into
pub const IMPORT_DIR_EXCLUSIONS: &[&str] = &["onedrive", "exports", "appdata"];

/// Maximum depth below the search root when looking for import roots
pub const IMPORT_SEARCH_MAX_DEPTH: usize = 3;

// =============================================================================
// Classification and Renaming
// =============================================================================

/// Prefix given to files identified as survey/metadata exports
pub const SURVEY_FILE_PREFIX: &str = "Survey";

/// Extension forced onto survey/metadata files
pub const SURVEY_FILE_EXTENSION: &str = "csv";

/// Number of leading characters of a sensor name used as its file prefix
pub const DERIVED_PREFIX_LEN: usize = 3;

// =============================================================================
// Boundary Detection
// =============================================================================

/// Sentinel row written by the recorder just above the column header
pub const DATA_MARKER: &str = "#DATA";

/// First cell of the participant row at the top of survey exports
pub const SONA_ID_MARKER: &str = "sona_id";

/// First cell of the survey question row
pub const QUESTION_NUMBER_MARKER: &str = "question_number";

/// Offset from a marker row to the first body row
pub const DEFAULT_MARKER_OFFSET: usize = 2;

/// Maximum number of leading rows inspected for a marker
pub const DEFAULT_SCAN_WINDOW: usize = 40;

/// Narrower files are treated as potentially mis-delimited
pub const DEFAULT_EXPECTED_COLUMNS: usize = 6;

// =============================================================================
// Extraction
// =============================================================================

/// Total attempts (first try plus one retry) allowed per file
pub const MAX_ATTEMPTS: usize = 2;

// =============================================================================
// Survey Scoring
// =============================================================================

/// Column holding the correctness flag in survey body rows
pub const SURVEY_CORRECT_COLUMN: usize = 4;

/// Column holding the leftover time in survey body rows
pub const SURVEY_TIME_COLUMN: usize = 5;

/// Header of the survey score table
pub const SURVEY_RESULT_HEADER: &[&str] = &["SONA ID", "% Correct", "Leftover Time"];

/// Default file name of the survey score table
pub const SURVEY_RESULT_FILE: &str = "RESULT.csv";

// =============================================================================
// Helper Functions
// =============================================================================

/// Build the export folder name for a study, e.g. `Pilot Study` -> `Pilot_Study_Exports`
pub fn export_folder_name(study_name: &str) -> String {
    let study = study_name.split_whitespace().collect::<Vec<_>>().join("_");
    let study = if study.is_empty() {
        DEFAULT_STUDY_NAME.to_string()
    } else {
        study
    };
    format!("{}{}", study, EXPORT_FOLDER_SUFFIX)
}

/// Derive a file prefix from a sensor name: first characters, upper-cased
pub fn derived_prefix(sensor_name: &str) -> String {
    sensor_name
        .chars()
        .take(DERIVED_PREFIX_LEN)
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_folder_name() {
        assert_eq!(export_folder_name("Pilot Study"), "Pilot_Study_Exports");
        assert_eq!(export_folder_name("  spaced   out "), "spaced_out_Exports");
        assert_eq!(export_folder_name(""), "iMotions_Exports");
    }

    #[test]
    fn test_derived_prefix() {
        assert_eq!(derived_prefix("EyeTracking"), "EYE");
        assert_eq!(derived_prefix("GSR"), "GSR");
        assert_eq!(derived_prefix("hr"), "HR");
    }
}
