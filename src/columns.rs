//! Column selection and projection.
//!
//! Each sensor type carries an ordered list of canonical output columns.
//! An operator may narrow it with an index/range string such as `0-2,5`.
//! The resolved selection is then reconciled against the header of each
//! file, silently dropping columns the file does not contain.

use crate::models::SensorType;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::{debug, warn};

static SELECTION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*(?:-\s*(\d+)\s*)?$").expect("selection token pattern is valid")
});

/// Resolved output columns for one sensor type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub sensor: String,
    pub columns: Vec<String>,
    /// Narrowed by an operator rather than taken from the sensor table
    pub manual: bool,
}

impl ColumnSelection {
    /// The sensor's canonical column list, unmodified
    pub fn defaults(sensor: &SensorType) -> Self {
        Self {
            sensor: sensor.name.clone(),
            columns: sensor.columns.clone(),
            manual: false,
        }
    }

    /// Apply an index/range string, falling back to the defaults when it yields nothing
    pub fn from_input(sensor: &SensorType, input: &str) -> Self {
        match parse_selection(input, sensor.columns.len()) {
            Some(indices) => Self {
                sensor: sensor.name.clone(),
                columns: indices
                    .into_iter()
                    .map(|i| sensor.columns[i].clone())
                    .collect(),
                manual: true,
            },
            None => {
                warn!(
                    "Column selection '{}' for {} is not usable, keeping all {} columns",
                    input,
                    sensor.name,
                    sensor.columns.len()
                );
                Self::defaults(sensor)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Requested columns present in `header`, in requested order, with their header positions
    ///
    /// Header cells are compared after trimming; the first occurrence of a
    /// duplicated header name wins.
    pub fn reconcile<S: AsRef<str>>(&self, header: &[S]) -> Vec<(String, usize)> {
        let projected: Vec<(String, usize)> = self
            .columns
            .iter()
            .filter_map(|column| {
                header
                    .iter()
                    .position(|cell| cell.as_ref().trim() == column)
                    .map(|position| (column.clone(), position))
            })
            .collect();

        if projected.len() < self.columns.len() {
            debug!(
                "{}: {} of {} requested columns present in header",
                self.sensor,
                projected.len(),
                self.columns.len()
            );
        }

        projected
    }
}

/// Parse a comma-separated list of indices and inclusive `start-end` ranges
///
/// Indices are deduplicated and sorted; those outside `0..len` are
/// dropped. Returns `None` when a token cannot be parsed or nothing
/// valid remains.
pub fn parse_selection(input: &str, len: usize) -> Option<Vec<usize>> {
    let mut indices = BTreeSet::new();

    for token in input.split(',') {
        if token.trim().is_empty() {
            continue;
        }

        let captures = SELECTION_TOKEN.captures(token)?;
        let start: usize = captures.get(1)?.as_str().parse().ok()?;
        let end: usize = match captures.get(2) {
            Some(end) => end.as_str().parse().ok()?,
            None => start,
        };

        indices.extend((start..=end).filter(|&i| i < len));
    }

    if indices.is_empty() {
        None
    } else {
        Some(indices.into_iter().collect())
    }
}

/// Decides the column selection for each sensor folder
pub trait SelectionSource {
    fn select(&mut self, sensor: &SensorType) -> ColumnSelection {
        ColumnSelection::defaults(sensor)
    }
}

/// Always uses the sensor table's canonical columns
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSelection;

impl SelectionSource for DefaultSelection {}

/// Per-sensor selection strings supplied up front, e.g. from the command line
#[derive(Debug, Default, Clone)]
pub struct PresetSelection {
    presets: HashMap<String, String>,
}

impl PresetSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preset(mut self, sensor: &str, input: &str) -> Self {
        self.presets.insert(sensor.to_string(), input.to_string());
        self
    }

    /// Parse `SENSOR=SELECTION` assignments
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Self {
        let mut selection = Self::new();
        for assignment in assignments {
            match assignment.as_ref().split_once('=') {
                Some((sensor, input)) => {
                    selection = selection.with_preset(sensor.trim(), input.trim());
                }
                None => warn!(
                    "Ignoring column assignment '{}', expected SENSOR=SELECTION",
                    assignment.as_ref()
                ),
            }
        }
        selection
    }
}

impl SelectionSource for PresetSelection {
    fn select(&mut self, sensor: &SensorType) -> ColumnSelection {
        match self.presets.get(&sensor.name) {
            Some(input) => ColumnSelection::from_input(sensor, input),
            None => ColumnSelection::defaults(sensor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gsr() -> SensorType {
        SensorType::new(
            "GSR",
            &["Shimmer"],
            &[
                "Timestamp",
                "GSR RAW",
                "GSR Resistance CAL",
                "GSR Conductance CAL",
                "Heart Rate PPG ALG",
                "IBI PPG ALG",
                "Internal ADC A13 PPG RAW",
            ],
        )
    }

    #[test]
    fn test_parse_selection_ranges_and_indices() {
        assert_eq!(parse_selection("0-2,5", 7), Some(vec![0, 1, 2, 5]));
        assert_eq!(parse_selection("2,0-2,5", 7), Some(vec![0, 1, 2, 5]));
        assert_eq!(parse_selection(" 3 , 1 - 1 ", 7), Some(vec![1, 3]));
    }

    #[test]
    fn test_parse_selection_drops_out_of_range() {
        assert_eq!(parse_selection("5-9", 7), Some(vec![5, 6]));
        assert_eq!(parse_selection("10", 7), None);
    }

    #[test]
    fn test_parse_selection_rejects_garbage() {
        assert_eq!(parse_selection("", 7), None);
        assert_eq!(parse_selection("abc", 7), None);
        assert_eq!(parse_selection("1,x", 7), None);
        assert_eq!(parse_selection("-1", 7), None);
        assert_eq!(parse_selection("3-1", 7), None);
    }

    #[test]
    fn test_from_input_falls_back_to_defaults() {
        let sensor = gsr();

        let narrowed = ColumnSelection::from_input(&sensor, "0,1");
        assert!(narrowed.manual);
        assert_eq!(narrowed.columns, vec!["Timestamp", "GSR RAW"]);

        let fallback = ColumnSelection::from_input(&sensor, "nonsense");
        assert!(!fallback.manual);
        assert_eq!(fallback.columns, sensor.columns);
    }

    #[test]
    fn test_reconcile_drops_missing_columns() {
        let sensor = SensorType::new("GSR", &[], &["Timestamp", "GSR RAW", "Nonexistent"]);
        let selection = ColumnSelection::defaults(&sensor);
        let header = vec!["Timestamp", "GSR RAW"];

        let projected = selection.reconcile(&header);
        assert_eq!(
            projected,
            vec![("Timestamp".to_string(), 0), ("GSR RAW".to_string(), 1)]
        );
    }

    #[test]
    fn test_reconcile_keeps_requested_order() {
        let sensor = SensorType::new("GSR", &[], &["Timestamp", "GSR RAW"]);
        let selection = ColumnSelection::defaults(&sensor);
        let header = vec![" GSR RAW ", "Row", "Timestamp", "GSR RAW"];

        let projected = selection.reconcile(&header);
        assert_eq!(
            projected,
            vec![("Timestamp".to_string(), 2), ("GSR RAW".to_string(), 0)]
        );
    }

    #[test]
    fn test_reconcile_no_overlap() {
        let selection = ColumnSelection::defaults(&gsr());
        assert!(selection.reconcile(&["a", "b"]).is_empty());
    }

    #[test]
    fn test_preset_selection() {
        let mut source =
            PresetSelection::from_assignments(&["GSR=0-1", "missing-equals", "Eye=2"]);

        let gsr_selection = source.select(&gsr());
        assert_eq!(gsr_selection.columns, vec!["Timestamp", "GSR RAW"]);

        let other = SensorType::new("HeartRate", &[], &["Timestamp"]);
        assert_eq!(source.select(&other), ColumnSelection::defaults(&other));
    }

    #[test]
    fn test_default_selection() {
        let sensor = gsr();
        assert_eq!(
            DefaultSelection.select(&sensor),
            ColumnSelection::defaults(&sensor)
        );
    }
}
