//! End-to-end tests for cleaning an iMotions study export
//!
//! These tests build a realistic export tree on disk (metadata preamble,
//! `#DATA` marker, extra device columns) and run it through the public API.

use imotions_cleaner::columns::{DefaultSelection, PresetSelection};
use imotions_cleaner::constants::MAX_ATTEMPTS;
use imotions_cleaner::models::{FallbackReason, FileStatus, NotFoundReason};
use imotions_cleaner::processor::NoopObserver;
use imotions_cleaner::{BoundaryDetector, CleanerConfig, Detection, StudyProcessor};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const GSR_HEADER: &str = "Row,Timestamp,SampleNumber,GSR RAW,GSR Resistance CAL,\
GSR Conductance CAL,Heart Rate PPG ALG,IBI PPG ALG,Internal ADC A13 PPG CAL";

/// GSR export: 14 metadata rows, `#DATA` at row 14, header at 15, body from 16
fn gsr_export() -> String {
    let mut text = String::new();
    for i in 0..14 {
        text.push_str(&format!("#METADATA_{},value {},,,,,,,\n", i, i));
    }
    text.push_str("#DATA,,,,,,,,\n");
    text.push_str(GSR_HEADER);
    text.push('\n');
    text.push_str("1,1000,1,512,150.2,6.65,72,833,1.2\n");
    text.push_str("2,1001,2,515,150.1,6.66,72,834,1.3\n");
    text.push_str(",,,,,,,,\n");
    text.push_str("3,1002,3,517,149.9,6.67,73,830,1.1\n");
    text
}

const FACIAL_EXPORT: &str = "#Study,Pilot,,\n#Respondent,P001,,\n#DATA,,,\n\
Timestamp,Joy,Anger,Unknown\n\
10,0.1,0.0,x\n";

const SURVEY_EXPORT: &str = "sona_id,24680\n\
question_number,question,response,correct_answer,correct,time_left\n\
1,Q1,a,a,1,2.5\n\
2,Q2,b,b,1,1.5\n";

fn create_import_tree(root: &Path) -> PathBuf {
    let import = root.join("Pilot_results");
    let files: [(&str, &str, String); 5] = [
        ("Shimmer3_GSR_P001", "gsr_data_001.csv", gsr_export()),
        ("Affectiva_P001", "P001_affdex_12.csv", FACIAL_EXPORT.to_string()),
        ("fblmist_P001", "P001_fblmist_results.csv", SURVEY_EXPORT.to_string()),
        (
            "Polar_H10_P001",
            "polar_export_5.csv",
            "Timestamp;Heart Rate\n1;70\n".to_string(),
        ),
        ("Camera_P001", "video_index.txt", "frames".to_string()),
    ];

    for (folder, file, content) in files {
        fs::create_dir_all(import.join(folder)).unwrap();
        fs::write(import.join(folder).join(file), content).unwrap();
    }
    import
}

/// Clean a complete study with the built-in sensor table
///
/// Purpose: Validate copy, classification, extraction and reporting together
/// Benefit: Catches regressions in how the stages hand data to each other
#[test]
fn test_clean_study_export() {
    let temp_dir = TempDir::new().unwrap();
    let import = create_import_tree(temp_dir.path());
    let export_root = temp_dir.path().join("Pilot_Exports");
    let config = CleanerConfig::default();
    let processor = StudyProcessor::new(&config, &export_root);

    let summary = processor
        .run(&import, false, &mut DefaultSelection, &mut NoopObserver)
        .unwrap();

    let data = &processor.layout().data_dir;
    let results = &processor.layout().results_dir;

    // canonical working tree
    assert!(data.join("GSR").join("GSR_001.csv").is_file());
    assert!(data.join("FacialExpression").join("FEA_12.csv").is_file());
    assert!(data.join("Survey").join("Survey_P001.csv").is_file());
    assert!(data.join("HeartRate").join("HR_5.csv").is_file());
    assert!(data.join("Camera_P001").is_dir());

    assert_eq!(
        fs::read_to_string(results.join("GSR").join("GSR_001.csv")).unwrap(),
        "Timestamp,GSR RAW,GSR Resistance CAL,GSR Conductance CAL,Heart Rate PPG ALG,IBI PPG ALG\n\
         1000,512,150.2,6.65,72,833\n\
         1001,515,150.1,6.66,72,834\n\
         1002,517,149.9,6.67,73,830\n"
    );
    assert_eq!(
        fs::read_to_string(results.join("FacialExpression").join("FEA_12.csv")).unwrap(),
        "Timestamp,Anger,Joy\n10,0.0,0.1\n"
    );

    let gsr = summary
        .files
        .iter()
        .find(|report| report.sensor == "GSR")
        .unwrap();
    assert_eq!(gsr.status, FileStatus::Cleaned);
    assert_eq!(gsr.attempts, 1);
    assert_eq!(gsr.rows_written, 3);
    let boundary = gsr.boundary.as_ref().unwrap();
    assert_eq!(boundary.marker_row, 14);
    assert_eq!(boundary.data_start, 16);
    assert_eq!(boundary.header_row(), Some(15));

    // semicolon-delimited heart rate export has no marker and is copied as-is
    let heart_rate = summary
        .files
        .iter()
        .find(|report| report.sensor == "HeartRate")
        .unwrap();
    assert!(matches!(
        heart_rate.status,
        FileStatus::FallbackCopied {
            reason: FallbackReason::BoundaryNotFound { .. }
        }
    ));
    assert_eq!(
        fs::read_to_string(results.join("HeartRate").join("HR_5.csv")).unwrap(),
        "Timestamp;Heart Rate\n1;70\n"
    );

    assert_eq!(summary.sensors_processed, 4);
    assert_eq!(summary.files_cleaned, 3);
    assert_eq!(summary.files_fallback, 1);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(summary.total_files(), 4);
    assert_eq!(summary.unprocessed_files().len(), 1);
}

/// Narrow the GSR selection to a preset
///
/// Purpose: Validate that index selections flow through to the output header
/// Benefit: Guards the `--columns` path used for unattended runs
#[test]
fn test_preset_columns_follow_canonical_order() {
    let temp_dir = TempDir::new().unwrap();
    let import = create_import_tree(temp_dir.path());
    let config = CleanerConfig::default();
    let processor = StudyProcessor::new(&config, &temp_dir.path().join("Pilot_Exports"));
    let mut selection = PresetSelection::from_assignments(&["GSR=5,0"]);

    processor
        .run(&import, false, &mut selection, &mut NoopObserver)
        .unwrap();

    assert_eq!(
        fs::read_to_string(
            processor
                .layout()
                .results_dir
                .join("GSR")
                .join("GSR_001.csv")
        )
        .unwrap(),
        "Timestamp,IBI PPG ALG\n1000,833\n1001,834\n1002,830\n"
    );
}

/// A sensor whose columns never appear is retried, then copied
///
/// Purpose: Validate the bounded retry before a fallback copy
/// Benefit: Ensures a misconfigured sensor never stalls a run
#[test]
fn test_unknown_columns_fall_back_after_retry() {
    let temp_dir = TempDir::new().unwrap();
    let import = create_import_tree(temp_dir.path());
    let mut config = CleanerConfig::default();
    config
        .sensors
        .iter_mut()
        .filter(|sensor| sensor.name == "FacialExpression")
        .for_each(|sensor| sensor.columns = vec!["Brow Furrow".to_string()]);
    let processor = StudyProcessor::new(&config, &temp_dir.path().join("Pilot_Exports"));

    let summary = processor
        .run(&import, false, &mut DefaultSelection, &mut NoopObserver)
        .unwrap();

    let facial = summary
        .files
        .iter()
        .find(|report| report.sensor == "FacialExpression")
        .unwrap();
    assert_eq!(facial.attempts, MAX_ATTEMPTS);
    assert!(matches!(
        facial.status,
        FileStatus::FallbackCopied {
            reason: FallbackReason::NoColumnOverlap {
                header_row: Some(3)
            }
        }
    ));
    assert_eq!(
        fs::read_to_string(&facial.destination).unwrap(),
        FACIAL_EXPORT
    );
}

/// Boundary detection straight from the public detector
#[test]
fn test_detector_on_export_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gsr.csv");
    fs::write(&path, gsr_export()).unwrap();

    let config = CleanerConfig::default();
    let detector = BoundaryDetector::new(&config.detection);

    assert_eq!(detector.detect(&path).data_start(), Some(16));
    assert_eq!(
        detector.detect(&temp_dir.path().join("absent.csv")),
        Detection::NotFound(NotFoundReason::FileMissing)
    );
}
