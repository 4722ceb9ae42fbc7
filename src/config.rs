//! Configuration management and validation.
//!
//! Provides the sensor table (sensor type -> keywords -> canonical
//! columns) together with the boundary detection and extraction
//! settings. The configuration is constructed once at start-up and
//! passed by reference into every component.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DATA_MARKER, DEFAULT_EXPECTED_COLUMNS,
    DEFAULT_MARKER_OFFSET, DEFAULT_SCAN_WINDOW, QUESTION_NUMBER_MARKER, SONA_ID_MARKER,
};
use crate::error::{CleanerError, Result};
use crate::models::SensorType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Top-level key of the sensor keyword table in the legacy format
const LEGACY_SENSORS_KEY: &str = "RECOGNIZED_SENSORS";

/// Top-level key of the canonical column table in the legacy format
const LEGACY_COLUMNS_KEY: &str = "SENSOR_STIMULUS";

/// A recognized first-cell token and the distance from its row to the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRule {
    pub token: String,
    pub offset: usize,
}

impl MarkerRule {
    pub fn new(token: &str, offset: usize) -> Self {
        Self {
            token: token.to_string(),
            offset,
        }
    }
}

/// Boundary detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Marker tokens, checked against the first cell of each row
    pub markers: Vec<MarkerRule>,

    /// Maximum number of leading rows scanned
    pub scan_window: usize,

    /// Files narrower than this are re-read with a forced column count
    pub expected_columns: usize,

    /// Field delimiter of the export files
    pub delimiter: char,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            markers: vec![
                MarkerRule::new(DATA_MARKER, DEFAULT_MARKER_OFFSET),
                MarkerRule::new(SONA_ID_MARKER, DEFAULT_MARKER_OFFSET),
                MarkerRule::new(QUESTION_NUMBER_MARKER, DEFAULT_MARKER_OFFSET),
            ],
            scan_window: DEFAULT_SCAN_WINDOW,
            expected_columns: DEFAULT_EXPECTED_COLUMNS,
            delimiter: ',',
        }
    }
}

impl DetectionConfig {
    /// Delimiter as the single byte the CSV reader expects
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees an ASCII delimiter
        self.delimiter as u8
    }

    /// Offset configured for a marker token
    pub fn offset_for(&self, token: &str) -> Option<usize> {
        self.markers
            .iter()
            .find(|rule| rule.token == token)
            .map(|rule| rule.offset)
    }
}

/// Classification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Match folder keywords case-sensitively
    pub case_sensitive: bool,
}

/// Extraction output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Write the metadata rows above the header into the cleaned output
    pub preserve_preamble: bool,
}

/// Global configuration for export cleaning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Ordered sensor table; classification is first-match-wins
    pub sensors: Vec<SensorType>,

    pub classification: ClassificationConfig,

    pub detection: DetectionConfig,

    pub extraction: ExtractionConfig,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            sensors: default_sensor_table(),
            classification: ClassificationConfig::default(),
            detection: DetectionConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

/// Built-in sensor table for a typical iMotions study
fn default_sensor_table() -> Vec<SensorType> {
    vec![
        SensorType::new(
            "GSR",
            &["Shimmer", "GSR", "EDA"],
            &[
                "Timestamp",
                "GSR RAW",
                "GSR Resistance CAL",
                "GSR Conductance CAL",
                "Heart Rate PPG ALG",
                "IBI PPG ALG",
            ],
        ),
        SensorType::new(
            "EyeTracking",
            &["Tobii", "EyeTracking", "Eye_Tracking", "Gaze"],
            &[
                "Timestamp",
                "ET_GazeLeftx",
                "ET_GazeLefty",
                "ET_GazeRightx",
                "ET_GazeRighty",
                "ET_PupilLeft",
                "ET_PupilRight",
                "ET_ValidityLeftEye",
                "ET_ValidityRightEye",
            ],
        ),
        SensorType::new(
            "FacialExpression",
            &["Affectiva", "AFFDEX", "FACET", "Emotient", "FEA", "Facial"],
            &[
                "Timestamp",
                "Anger",
                "Contempt",
                "Disgust",
                "Fear",
                "Joy",
                "Sadness",
                "Surprise",
                "Engagement",
                "Valence",
            ],
        )
        .with_prefix("FEA"),
        SensorType::new(
            "HeartRate",
            &["Polar", "HeartRate", "Heart_Rate", "ECG"],
            &["Timestamp", "Heart Rate", "R-R Interval"],
        )
        .with_prefix("HR"),
        SensorType::new(
            "Survey",
            &["Survey", "Questionnaire", "fblmist"],
            &[
                "question_number",
                "question",
                "response",
                "correct_answer",
                "correct",
                "time_left",
            ],
        )
        .with_prefix("FBL"),
    ]
}

impl CleanerConfig {
    /// Replace the sensor table
    pub fn with_sensors(mut self, sensors: Vec<SensorType>) -> Self {
        self.sensors = sensors;
        self
    }

    /// Replace the recognized marker tokens
    pub fn with_markers(mut self, markers: Vec<MarkerRule>) -> Self {
        self.detection.markers = markers;
        self
    }

    pub fn with_scan_window(mut self, rows: usize) -> Self {
        self.detection.scan_window = rows;
        self
    }

    pub fn with_preserve_preamble(mut self, preserve: bool) -> Self {
        self.extraction.preserve_preamble = preserve;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.classification.case_sensitive = case_sensitive;
        self
    }

    /// Look up a sensor type by canonical name
    pub fn sensor(&self, name: &str) -> Option<&SensorType> {
        self.sensors.iter().find(|sensor| sensor.name == name)
    }

    /// Default configuration file location
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            CleanerError::configuration("Could not determine user configuration directory")
        })?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from an explicit file, the default location, or built-in defaults
    pub fn load_layered(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(CleanerError::configuration(format!(
                        "Config file does not exist: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None => match Self::default_config_path() {
                Ok(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    info!("No config file found, using built-in sensor table");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file in either the native or the legacy sensor format
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Using config file: {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| CleanerError::io(path, e))?;
        Self::from_json_str(&text).map_err(|source| CleanerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse JSON text, detecting the legacy `RECOGNIZED_SENSORS` layout
    pub fn from_json_str(text: &str) -> std::result::Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;

        if value.get(LEGACY_SENSORS_KEY).is_some() {
            debug!("Detected legacy sensor configuration layout");
            Ok(Self::from_legacy_value(&value))
        } else {
            serde_json::from_value(value)
        }
    }

    /// Build a configuration from the legacy two-table layout
    fn from_legacy_value(value: &Value) -> Self {
        let columns_table = value.get(LEGACY_COLUMNS_KEY).and_then(Value::as_object);

        let sensors = value
            .get(LEGACY_SENSORS_KEY)
            .and_then(Value::as_object)
            .map(|table| {
                table
                    .iter()
                    .map(|(name, keywords)| SensorType {
                        name: name.clone(),
                        keywords: string_list(keywords),
                        columns: columns_table
                            .and_then(|columns| columns.get(name))
                            .map(string_list)
                            .unwrap_or_default(),
                        prefix: None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            sensors,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sensors.is_empty() {
            return Err(CleanerError::configuration(
                "Sensor table must contain at least one sensor type",
            ));
        }

        let mut names = HashSet::new();
        for sensor in &self.sensors {
            if sensor.name.trim().is_empty() {
                return Err(CleanerError::configuration("Sensor names cannot be empty"));
            }
            if sensor.name.contains(['/', '\\']) {
                return Err(CleanerError::configuration(format!(
                    "Sensor name '{}' cannot contain path separators",
                    sensor.name
                )));
            }
            if !names.insert(sensor.name.as_str()) {
                return Err(CleanerError::configuration(format!(
                    "Duplicate sensor name '{}'",
                    sensor.name
                )));
            }
            if sensor.keywords.iter().any(|keyword| keyword.is_empty()) {
                return Err(CleanerError::configuration(format!(
                    "Sensor '{}' has an empty keyword",
                    sensor.name
                )));
            }
            if sensor.columns.is_empty() {
                warn!(
                    "Sensor '{}' has no canonical columns; its files will be copied unprocessed",
                    sensor.name
                );
            }
        }

        if self.detection.markers.is_empty() {
            return Err(CleanerError::configuration(
                "At least one boundary marker must be configured",
            ));
        }
        if self.detection.scan_window == 0 {
            return Err(CleanerError::configuration(
                "Scan window must be greater than 0",
            ));
        }
        if !self.detection.delimiter.is_ascii() {
            return Err(CleanerError::configuration(format!(
                "Delimiter '{}' must be a single ASCII character",
                self.detection.delimiter
            )));
        }

        for (earlier, later) in self.overlapping_keywords() {
            warn!(
                "Keyword overlap between '{}' and '{}'; table order decides",
                earlier, later
            );
        }

        Ok(())
    }

    /// Pairs of sensors where a later sensor's keyword also contains an earlier one's
    pub fn overlapping_keywords(&self) -> Vec<(String, String)> {
        let mut overlaps = Vec::new();
        for (i, earlier) in self.sensors.iter().enumerate() {
            for later in &self.sensors[i + 1..] {
                let overlaps_here = later.keywords.iter().any(|keyword| {
                    earlier.matches_keyword(keyword, self.classification.case_sensitive)
                });
                if overlaps_here {
                    overlaps.push((earlier.name.clone(), later.name.clone()));
                }
            }
        }
        overlaps
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
