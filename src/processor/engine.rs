//! Per-file extraction.
//!
//! Each file moves through `Detecting -> Projecting -> Writing` and ends
//! either cleaned or copied verbatim. Empty column overlap and parse
//! failures get one fresh attempt from detection before the file falls
//! back to a byte-identical copy.

use crate::boundary::{BoundaryDetector, SourceText, forced_split, parse_row};
use crate::columns::ColumnSelection;
use crate::config::CleanerConfig;
use crate::constants::MAX_ATTEMPTS;
use crate::error::{CleanerError, Result};
use crate::models::{DataBoundary, Detection, FallbackReason, FileReport, FileStatus};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Cleaned file contents, assembled in memory before the single write
#[derive(Debug)]
struct CleanedOutput {
    bytes: Vec<u8>,
    columns: Vec<String>,
    rows: usize,
}

#[derive(Debug)]
enum Stage {
    Detecting,
    Projecting {
        source: SourceText,
        boundary: DataBoundary,
    },
    Writing {
        source: SourceText,
        boundary: DataBoundary,
        header_width: usize,
        projection: Vec<(String, usize)>,
    },
    Done(CleanedOutput),
    FallbackCopy(FallbackReason),
}

/// Extracts the selected columns from one export file
#[derive(Debug, Clone, Copy)]
pub struct ExtractionEngine<'a> {
    config: &'a CleanerConfig,
    detector: BoundaryDetector<'a>,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(config: &'a CleanerConfig) -> Self {
        Self {
            config,
            detector: BoundaryDetector::new(&config.detection),
        }
    }

    /// Clean `source` into `destination`, falling back to a verbatim copy
    ///
    /// Never returns an error: every outcome is recorded on the report.
    pub fn extract(
        &self,
        source: &Path,
        destination: &Path,
        selection: &ColumnSelection,
    ) -> FileReport {
        let mut attempts = 1;
        let mut boundary = None;
        let mut stage = Stage::Detecting;

        let outcome = loop {
            stage = match stage {
                Stage::Detecting => match self.detect(source) {
                    Ok((text, detected)) => {
                        boundary = Some(detected.clone());
                        Stage::Projecting {
                            source: text,
                            boundary: detected,
                        }
                    }
                    Err(reason) => Stage::FallbackCopy(reason),
                },
                Stage::Projecting {
                    source: text,
                    boundary: detected,
                } => match self.project(&text, &detected, selection) {
                    Ok((header_width, projection)) => Stage::Writing {
                        source: text,
                        boundary: detected,
                        header_width,
                        projection,
                    },
                    Err(reason) => retry_or_fallback(&mut attempts, reason),
                },
                Stage::Writing {
                    source: text,
                    boundary: detected,
                    header_width,
                    projection,
                } => match self.render(&text, &detected, header_width, &projection) {
                    Ok(output) => match write_output(destination, &output.bytes) {
                        Ok(()) => Stage::Done(output),
                        Err(e) => Stage::FallbackCopy(FallbackReason::OutputWrite {
                            message: e.to_string(),
                        }),
                    },
                    Err(reason @ FallbackReason::OutputWrite { .. }) => {
                        Stage::FallbackCopy(reason)
                    }
                    Err(reason) => retry_or_fallback(&mut attempts, reason),
                },
                Stage::Done(output) => break Ok(output),
                Stage::FallbackCopy(reason) => break Err(reason),
            };
        };

        let mut report = FileReport {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            sensor: selection.sensor.clone(),
            status: FileStatus::Cleaned,
            attempts,
            boundary,
            columns: Vec::new(),
            rows_written: 0,
        };

        match outcome {
            Ok(output) => {
                debug!(
                    "Cleaned {}: {} columns, {} rows",
                    source.display(),
                    output.columns.len(),
                    output.rows
                );
                report.columns = output.columns;
                report.rows_written = output.rows;
            }
            Err(reason) => {
                report.status = match fallback_copy(source, destination) {
                    Ok(()) => {
                        warn!("{} copied unprocessed: {}", source.display(), reason);
                        FileStatus::FallbackCopied { reason }
                    }
                    Err(e) => {
                        warn!("{} failed: {}; {}", source.display(), reason, e);
                        FileStatus::Failed {
                            message: format!("{}; fallback copy failed: {}", reason, e),
                        }
                    }
                };
            }
        }

        report
    }

    fn detect(
        &self,
        path: &Path,
    ) -> std::result::Result<(SourceText, DataBoundary), FallbackReason> {
        let source = SourceText::read(path)
            .map_err(|reason| FallbackReason::BoundaryNotFound { reason })?;

        match self.detector.detect_in(&source) {
            Detection::Found(boundary) => {
                debug!(
                    "{}: data starts at row {} (marker '{}')",
                    path.display(),
                    boundary.data_start,
                    boundary.marker
                );
                Ok((source, boundary))
            }
            Detection::NotFound(reason) => Err(FallbackReason::BoundaryNotFound { reason }),
        }
    }

    /// Read the header row and reconcile it with the selection
    fn project(
        &self,
        source: &SourceText,
        boundary: &DataBoundary,
        selection: &ColumnSelection,
    ) -> std::result::Result<(usize, Vec<(String, usize)>), FallbackReason> {
        let header_row = boundary.header_row();
        let Some(line) = header_row.and_then(|row| source.line(row)) else {
            return Err(FallbackReason::NoColumnOverlap { header_row });
        };

        let header = self.split(line, boundary.forced_split).map_err(|e| {
            FallbackReason::ParseFailure {
                message: format!("header row: {}", e),
            }
        })?;

        let projection = selection.reconcile(&header);
        if projection.is_empty() {
            return Err(FallbackReason::NoColumnOverlap { header_row });
        }
        Ok((header.len(), projection))
    }

    /// Assemble preamble, header and projected body rows
    fn render(
        &self,
        source: &SourceText,
        boundary: &DataBoundary,
        header_width: usize,
        projection: &[(String, usize)],
    ) -> std::result::Result<CleanedOutput, FallbackReason> {
        let header_row = boundary.data_start.saturating_sub(1);
        let delimiter = self.config.detection.delimiter_byte();
        let width = projection.len();
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());

        if self.config.extraction.preserve_preamble {
            for row in 0..header_row {
                let line = source.line(row).unwrap_or_default();
                let mut cells = self
                    .split(line, boundary.forced_split)
                    .unwrap_or_else(|_| forced_split(line, delimiter, None));
                cells.resize(width, String::new());
                writer.write_record(&cells).map_err(output_failure)?;
            }
        }

        let columns: Vec<String> = projection.iter().map(|(name, _)| name.clone()).collect();
        writer.write_record(&columns).map_err(output_failure)?;

        let body = self.body_rows(source, boundary, header_width)?;
        let rows = body.len();
        for cells in body {
            let projected = projection
                .iter()
                .map(|(_, position)| cells.get(*position).map(String::as_str).unwrap_or(""));
            writer.write_record(projected).map_err(output_failure)?;
        }

        let bytes = writer.into_inner().map_err(|e| FallbackReason::OutputWrite {
            message: e.to_string(),
        })?;

        Ok(CleanedOutput {
            bytes,
            columns,
            rows,
        })
    }

    /// Body rows below the header; blank rows skipped, overlong rows rejected
    fn body_rows(
        &self,
        source: &SourceText,
        boundary: &DataBoundary,
        header_width: usize,
    ) -> std::result::Result<Vec<Vec<String>>, FallbackReason> {
        let delimiter = self.config.detection.delimiter_byte();
        let mut rows = Vec::new();

        if boundary.forced_split {
            for row in boundary.data_start..source.line_count() {
                let line = source.line(row).unwrap_or_default();
                let cells = forced_split(line, delimiter, None);
                push_body_row(&mut rows, cells, header_width, row)?;
            }
            return Ok(rows);
        }

        let header_row = boundary.data_start.saturating_sub(1);
        let text = source.from_line(header_row).unwrap_or_default();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        for record in reader.records() {
            let record = record.map_err(|e| FallbackReason::ParseFailure {
                message: e.to_string(),
            })?;
            let row = header_row
                + record
                    .position()
                    .map(|position| position.line() as usize)
                    .unwrap_or(1)
                - 1;
            let cells = record.iter().map(str::to_string).collect();
            push_body_row(&mut rows, cells, header_width, row)?;
        }

        Ok(rows)
    }

    fn split(&self, line: &str, forced: bool) -> std::result::Result<Vec<String>, csv::Error> {
        let delimiter = self.config.detection.delimiter_byte();
        if forced {
            Ok(forced_split(line, delimiter, None))
        } else {
            parse_row(line, delimiter)
        }
    }
}

fn push_body_row(
    rows: &mut Vec<Vec<String>>,
    cells: Vec<String>,
    header_width: usize,
    row: usize,
) -> std::result::Result<(), FallbackReason> {
    if cells.iter().all(|cell| cell.trim().is_empty()) {
        return Ok(());
    }
    if cells.len() > header_width {
        return Err(FallbackReason::ParseFailure {
            message: format!(
                "row {} has {} cells but the header has {}",
                row,
                cells.len(),
                header_width
            ),
        });
    }
    rows.push(cells);
    Ok(())
}

fn retry_or_fallback(attempts: &mut usize, reason: FallbackReason) -> Stage {
    if *attempts < MAX_ATTEMPTS {
        debug!("Attempt {} failed ({}), retrying", attempts, reason);
        *attempts += 1;
        Stage::Detecting
    } else {
        Stage::FallbackCopy(reason)
    }
}

fn output_failure(e: csv::Error) -> FallbackReason {
    FallbackReason::OutputWrite {
        message: e.to_string(),
    }
}

fn write_output(destination: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| CleanerError::io(parent, e))?;
    }
    fs::write(destination, bytes).map_err(|e| CleanerError::io(destination, e))
}

fn fallback_copy(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| CleanerError::io(parent, e))?;
    }
    fs::copy(source, destination)
        .map(|_| ())
        .map_err(|e| CleanerError::io(source, e))
}
