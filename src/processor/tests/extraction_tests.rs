//! Per-file extraction tests

use crate::columns::ColumnSelection;
use crate::config::CleanerConfig;
use crate::models::{FallbackReason, FileStatus, NotFoundReason};
use crate::processor::engine::ExtractionEngine;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// GSR export with fourteen preamble rows, `#DATA` at row 14 and the header at row 15
fn gsr_export() -> String {
    let mut content: String = (0..14)
        .map(|i| format!("#META_{},info {}\n", i, i))
        .collect();
    content.push_str("#DATA\n");
    content.push_str("Row,Timestamp,GSR RAW,GSR Conductance CAL,Marker\n");
    content.push_str("1,1000,512,3.2,\n");
    content.push_str("2,1001,515,3.3,A\n");
    content
}

fn write_source(temp_dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = temp_dir.path().join("Data").join("GSR").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn destination(temp_dir: &TempDir, name: &str) -> PathBuf {
    temp_dir.path().join("Results").join("GSR").join(name)
}

fn gsr_selection(config: &CleanerConfig) -> ColumnSelection {
    ColumnSelection::defaults(config.sensor("GSR").unwrap())
}

fn assert_verbatim(source: &Path, destination: &Path) {
    assert_eq!(fs::read(source).unwrap(), fs::read(destination).unwrap());
}

#[test]
fn test_clean_extraction_projects_canonical_columns() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, "GSR_001.csv", &gsr_export());
    let output = destination(&temp_dir, "GSR_001.csv");

    let config = CleanerConfig::default();
    let report = ExtractionEngine::new(&config).extract(&source, &output, &gsr_selection(&config));

    assert_eq!(report.status, FileStatus::Cleaned);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.rows_written, 2);
    assert_eq!(
        report.columns,
        vec!["Timestamp", "GSR RAW", "GSR Conductance CAL"]
    );

    let boundary = report.boundary.unwrap();
    assert_eq!(boundary.marker_row, 14);
    assert_eq!(boundary.data_start, 16);

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Timestamp,GSR RAW,GSR Conductance CAL\n1000,512,3.2\n1001,515,3.3\n"
    );
}

#[test]
fn test_short_rows_padded_and_blank_rows_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let content = "#DATA\nRow,Timestamp,GSR RAW\n1,1000,512\n\n,,\n2,1001\n";
    let source = write_source(&temp_dir, "GSR_002.csv", content);
    let output = destination(&temp_dir, "GSR_002.csv");

    let config = CleanerConfig::default();
    let report = ExtractionEngine::new(&config).extract(&source, &output, &gsr_selection(&config));

    assert_eq!(report.status, FileStatus::Cleaned);
    assert_eq!(report.rows_written, 2);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Timestamp,GSR RAW\n1000,512\n1001,\n"
    );
}

#[test]
fn test_missing_marker_copies_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let content = "Row,Timestamp,GSR RAW,a,b,c\n1,1000,512,1,2,3\n";
    let source = write_source(&temp_dir, "GSR_003.csv", content);
    let output = destination(&temp_dir, "GSR_003.csv");

    let config = CleanerConfig::default();
    let report = ExtractionEngine::new(&config).extract(&source, &output, &gsr_selection(&config));

    assert_eq!(
        report.status,
        FileStatus::FallbackCopied {
            reason: FallbackReason::BoundaryNotFound {
                reason: NotFoundReason::NoMarker { scanned_rows: 2 }
            }
        }
    );
    assert_eq!(report.attempts, 1);
    assert!(report.boundary.is_none());
    assert_verbatim(&source, &output);
}

#[test]
fn test_no_column_overlap_retries_then_copies() {
    let temp_dir = TempDir::new().unwrap();
    let content = "#DATA\nalpha,beta\n1,2\n";
    let source = write_source(&temp_dir, "GSR_004.csv", content);
    let output = destination(&temp_dir, "GSR_004.csv");

    let config = CleanerConfig::default();
    let report = ExtractionEngine::new(&config).extract(&source, &output, &gsr_selection(&config));

    assert_eq!(
        report.status,
        FileStatus::FallbackCopied {
            reason: FallbackReason::NoColumnOverlap {
                header_row: Some(1)
            }
        }
    );
    assert_eq!(report.attempts, 2);
    assert_verbatim(&source, &output);
}

#[test]
fn test_overlong_row_is_a_parse_failure() {
    let temp_dir = TempDir::new().unwrap();
    let content = "#DATA\nTimestamp,GSR RAW\n1000,512\n1001,515,extra\n";
    let source = write_source(&temp_dir, "GSR_005.csv", content);
    let output = destination(&temp_dir, "GSR_005.csv");

    let config = CleanerConfig::default();
    let report = ExtractionEngine::new(&config).extract(&source, &output, &gsr_selection(&config));

    match &report.status {
        FileStatus::FallbackCopied {
            reason: FallbackReason::ParseFailure { message },
        } => assert!(message.contains("row 3")),
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(report.attempts, 2);
    assert_verbatim(&source, &output);
}

#[test]
fn test_preamble_aligned_to_output_width() {
    let temp_dir = TempDir::new().unwrap();
    let content = "Study,Pilot\nDevice,Shimmer3,GSR+,firmware,0.7\n#DATA\nTimestamp,GSR RAW,Other\n1000,512,x\n";
    let source = write_source(&temp_dir, "GSR_006.csv", content);
    let output = destination(&temp_dir, "GSR_006.csv");

    let config = CleanerConfig::default().with_preserve_preamble(true);
    let report = ExtractionEngine::new(&config).extract(&source, &output, &gsr_selection(&config));

    assert_eq!(report.status, FileStatus::Cleaned);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Study,Pilot\nDevice,Shimmer3\n#DATA,\nTimestamp,GSR RAW\n1000,512\n"
    );
}

#[test]
fn test_mis_delimited_file_is_cleaned() {
    let temp_dir = TempDir::new().unwrap();
    let content = "\"Study,Pilot\"\n\"#DATA,,\"\n\"Timestamp,GSR RAW\"\n\"1000,512\"\n";
    let source = write_source(&temp_dir, "GSR_007.csv", content);
    let output = destination(&temp_dir, "GSR_007.csv");

    let config = CleanerConfig::default();
    let report = ExtractionEngine::new(&config).extract(&source, &output, &gsr_selection(&config));

    assert_eq!(report.status, FileStatus::Cleaned);
    assert!(report.boundary.unwrap().forced_split);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Timestamp,GSR RAW\n1000,512\n"
    );
}

#[test]
fn test_existing_output_is_overwritten() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, "GSR_008.csv", &gsr_export());
    let output = destination(&temp_dir, "GSR_008.csv");
    fs::create_dir_all(output.parent().unwrap()).unwrap();
    fs::write(&output, "stale contents from a previous run\n".repeat(50)).unwrap();

    let config = CleanerConfig::default();
    let engine = ExtractionEngine::new(&config);
    let first = engine.extract(&source, &output, &gsr_selection(&config));
    let first_output = fs::read_to_string(&output).unwrap();
    let second = engine.extract(&source, &output, &gsr_selection(&config));

    assert!(first.status.is_cleaned());
    assert!(second.status.is_cleaned());
    assert!(!first_output.contains("stale"));
    assert_eq!(first_output, fs::read_to_string(&output).unwrap());
}

#[test]
fn test_missing_source_is_reported_failed() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("Data").join("GSR").join("GSR_404.csv");
    let output = destination(&temp_dir, "GSR_404.csv");

    let config = CleanerConfig::default();
    let report = ExtractionEngine::new(&config).extract(&source, &output, &gsr_selection(&config));

    assert!(matches!(report.status, FileStatus::Failed { .. }));
    assert!(!output.exists());
}
