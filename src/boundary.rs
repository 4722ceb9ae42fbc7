//! Data boundary detection for iMotions export files.
//!
//! Export files open with a free-form metadata preamble of variable
//! length. The detector scans the leading rows for a configured marker
//! token in the first cell and reports where the tabular body begins.
//! A missing marker is an expected outcome, reported as
//! [`Detection::NotFound`] rather than an error.

use crate::config::DetectionConfig;
use crate::models::{DataBoundary, Detection, NotFoundReason};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: char = '\u{feff}';

/// Byte range of one physical row, line terminator excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineSpan {
    start: usize,
    end: usize,
}

/// Decoded file contents indexed by physical row
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    lines: Vec<LineSpan>,
}

impl SourceText {
    /// Read and decode a file, mapping every failure to a not-found reason
    pub fn read(path: &Path) -> std::result::Result<Self, NotFoundReason> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => NotFoundReason::FileMissing,
            _ => NotFoundReason::Unreadable {
                reason: e.to_string(),
            },
        })?;

        if bytes.is_empty() {
            return Err(NotFoundReason::Empty);
        }

        let text = String::from_utf8(bytes).map_err(|e| NotFoundReason::Malformed {
            reason: format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
        })?;

        let source = Self::from_string(text);
        if source.text.trim().is_empty() {
            return Err(NotFoundReason::Empty);
        }
        Ok(source)
    }

    /// Index already-decoded text
    pub fn from_string(text: String) -> Self {
        let text = match text.strip_prefix(UTF8_BOM) {
            Some(stripped) => stripped.to_string(),
            None => text,
        };
        let lines = split_lines(&text);
        Self { text, lines }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Row text without its terminator
    pub fn line(&self, row: usize) -> Option<&str> {
        self.lines
            .get(row)
            .map(|span| &self.text[span.start..span.end])
    }

    /// Everything from the start of `row` to the end of the file
    pub fn from_line(&self, row: usize) -> Option<&str> {
        self.lines.get(row).map(|span| &self.text[span.start..])
    }
}

fn split_lines(text: &str) -> Vec<LineSpan> {
    let mut lines = Vec::new();
    let mut start = 0;

    for (idx, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            let end = if idx > start && text.as_bytes()[idx - 1] == b'\r' {
                idx - 1
            } else {
                idx
            };
            lines.push(LineSpan { start, end });
            start = idx + 1;
        }
    }

    if start < text.len() {
        lines.push(LineSpan {
            start,
            end: text.len(),
        });
    }

    lines
}

/// Parse one physical row with quote handling
pub fn parse_row(line: &str, delimiter: u8) -> std::result::Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

/// Split a row without quote handling after stripping enclosing quotes
///
/// With `width`, the result is padded with empty cells or truncated.
pub fn forced_split(line: &str, delimiter: u8, width: Option<usize>) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);

    let mut cells: Vec<String> = inner
        .split(char::from(delimiter))
        .map(|cell| cell.trim_matches('"').to_string())
        .collect();

    if let Some(width) = width {
        cells.resize(width.max(1), String::new());
    }
    cells
}

/// Locates the first body row of an export file
#[derive(Debug, Clone, Copy)]
pub struct BoundaryDetector<'a> {
    config: &'a DetectionConfig,
}

impl<'a> BoundaryDetector<'a> {
    pub fn new(config: &'a DetectionConfig) -> Self {
        Self { config }
    }

    /// Detect the data boundary of a file on disk
    pub fn detect(&self, path: &Path) -> Detection {
        let detection = match SourceText::read(path) {
            Ok(source) => self.detect_in(&source),
            Err(reason) => Detection::NotFound(reason),
        };

        match &detection {
            Detection::Found(boundary) => debug!(
                "{}: marker '{}' at row {}, data starts at row {}",
                path.display(),
                boundary.marker,
                boundary.marker_row,
                boundary.data_start
            ),
            Detection::NotFound(reason) => debug!("{}: {}", path.display(), reason),
        }

        detection
    }

    /// Detect the data boundary of already-decoded text
    pub fn detect_in(&self, source: &SourceText) -> Detection {
        if source.line_count() == 0 {
            return Detection::NotFound(NotFoundReason::Empty);
        }

        let window = source.line_count().min(self.config.scan_window);
        let delimiter = self.config.delimiter_byte();
        let mut widest = 0;

        for row in 0..window {
            let Some(line) = source.line(row) else { break };
            let cells = match parse_row(line, delimiter) {
                Ok(cells) => cells,
                Err(e) => {
                    return Detection::NotFound(NotFoundReason::Malformed {
                        reason: format!("row {}: {}", row, e),
                    });
                }
            };
            widest = widest.max(cells.len());

            if let Some(boundary) = self.match_first_cell(row, cells.first(), false) {
                return Detection::Found(boundary);
            }
        }

        if widest < self.config.expected_columns {
            debug!(
                "Widest row has {} cells (expected {}), re-reading with forced column count",
                widest, self.config.expected_columns
            );
            for row in 0..window {
                let Some(line) = source.line(row) else { break };
                let cells = forced_split(line, delimiter, Some(self.config.expected_columns));
                if let Some(boundary) = self.match_first_cell(row, cells.first(), true) {
                    return Detection::Found(boundary);
                }
            }
        }

        Detection::NotFound(NotFoundReason::NoMarker {
            scanned_rows: window,
        })
    }

    fn match_first_cell(
        &self,
        row: usize,
        first_cell: Option<&String>,
        forced_split: bool,
    ) -> Option<DataBoundary> {
        let cell = first_cell.map(|cell| cell.trim())?;
        if cell.is_empty() {
            return None;
        }

        self.config.offset_for(cell).map(|offset| DataBoundary {
            marker_row: row,
            marker: cell.to_string(),
            data_start: row + offset,
            forced_split,
        })
    }
}
