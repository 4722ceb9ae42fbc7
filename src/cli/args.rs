//! Command-line argument definitions for the export cleaner
//!
//! This module defines the complete CLI interface using the clap derive API.

use crate::error::{CleanerError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the iMotions export cleaner
///
/// Normalizes iMotions sensor export folders and extracts clean,
/// column-projected CSV files from each export.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "imotions-cleaner",
    version,
    about = "Normalize iMotions sensor exports and extract clean CSV files",
    long_about = "Copies an iMotions export tree into a working folder, classifies each sensor \
                  folder (GSR, eye tracking, facial expression, heart rate, survey), renames \
                  folders and files to a canonical scheme, strips the metadata preamble from \
                  every file and keeps only the selected columns. Files that cannot be cleaned \
                  are copied unchanged and listed in the run summary."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the full pipeline: copy, classify, extract (main command)
    Process(ProcessArgs),
    /// Classify and rename the sensor folders of a data directory
    Classify(ClassifyArgs),
    /// Print the detected data boundary of export files
    Detect(DetectArgs),
    /// Score survey exports into a summary table
    Surveys(SurveysArgs),
}

/// Logging options shared by every subcommand
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LoggingArgs {
    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl LoggingArgs {
    /// Get the log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Arguments for the process command
#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// Import root holding the raw sensor export folders
    ///
    /// If not specified, directories whose names contain "results" are
    /// discovered under the home directory and offered for selection.
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATH",
        help = "Import root holding the raw sensor export folders"
    )]
    pub input_path: Option<PathBuf>,

    /// Export root receiving Data/ and Results/
    ///
    /// If not specified, the study name decides a `<Study>_Exports` folder
    /// under Downloads, Desktop or Documents.
    #[arg(
        short = 'e',
        long = "export",
        value_name = "PATH",
        help = "Export root receiving Data/ and Results/"
    )]
    pub export_path: Option<PathBuf>,

    /// Study name used to build the export folder name
    #[arg(
        short = 's',
        long = "study",
        value_name = "NAME",
        help = "Study name used to build the export folder name"
    )]
    pub study: Option<String>,

    /// Path to configuration file
    ///
    /// JSON sensor table in either the native format or the
    /// RECOGNIZED_SENSORS / SENSOR_STIMULUS format. If not specified,
    /// looks for <config dir>/imotions-cleaner/config.json
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (JSON format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Replace an existing working copy with a fresh copy of the import root
    #[arg(
        long = "discard",
        conflicts_with = "keep",
        help = "Delete the previous working copy before copying"
    )]
    pub discard: bool,

    /// Reuse an existing working copy without asking
    #[arg(long = "keep", help = "Reuse the previous working copy")]
    pub keep: bool,

    /// Prompt for a manual column selection per sensor
    #[arg(
        long = "select-columns",
        help = "Prompt for a manual column selection per sensor"
    )]
    pub select_columns: bool,

    /// Column selection per sensor, e.g. GSR=0-2,5 (repeatable)
    #[arg(
        long = "columns",
        value_name = "SENSOR=SELECTION",
        help = "Column indices per sensor, e.g. GSR=0-2,5 (repeatable)"
    )]
    pub columns: Vec<String>,

    /// Write the metadata rows above the header into cleaned files
    #[arg(
        long = "preserve-preamble",
        help = "Keep the metadata preamble in cleaned files"
    )]
    pub preserve_preamble: bool,

    /// Never prompt; use defaults for anything not given on the command line
    #[arg(short = 'y', long = "yes", help = "Run without interactive prompts")]
    pub yes: bool,

    #[command(flatten)]
    pub logging: LoggingArgs,

    /// Output format for the run summary
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,
}

/// Arguments for the classify command
#[derive(Debug, Clone, Parser)]
pub struct ClassifyArgs {
    /// Directory whose subfolders are classified and renamed in place
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (JSON format)"
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,
}

/// Arguments for the detect command
#[derive(Debug, Clone, Parser)]
pub struct DetectArgs {
    /// Export files to inspect
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (JSON format)"
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,
}

/// Arguments for the surveys command
#[derive(Debug, Clone, Parser)]
pub struct SurveysArgs {
    /// Directory holding survey CSV exports
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Summary table path; defaults to RESULT.csv inside DIR
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON output for machine processing
    Json,
}

impl Commands {
    pub fn logging(&self) -> &LoggingArgs {
        match self {
            Self::Process(args) => &args.logging,
            Self::Classify(args) => &args.logging,
            Self::Detect(args) => &args.logging,
            Self::Surveys(args) => &args.logging,
        }
    }
}

impl ProcessArgs {
    /// Validate the process command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if let Some(input_path) = &self.input_path {
            if !input_path.is_dir() {
                return Err(CleanerError::ImportRootNotFound {
                    path: input_path.clone(),
                });
            }
        }

        if let Some(config_file) = &self.config_file {
            if !config_file.is_file() {
                return Err(CleanerError::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }

        if self.select_columns && self.yes {
            return Err(CleanerError::configuration(
                "--select-columns prompts for input and cannot be combined with --yes",
            ));
        }

        Ok(())
    }

    /// Whether prompts may be shown
    pub fn interactive(&self) -> bool {
        !self.yes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_process_args_parsing() {
        let args = Args::parse_from([
            "imotions-cleaner",
            "process",
            "--input",
            "/tmp/import",
            "--study",
            "Pilot Study",
            "--columns",
            "GSR=0-2",
            "--columns",
            "Survey=4,5",
            "--discard",
            "-vv",
            "--output-format",
            "json",
        ]);

        let Some(Commands::Process(process)) = args.command else {
            panic!("expected process command");
        };
        assert_eq!(process.input_path, Some(PathBuf::from("/tmp/import")));
        assert_eq!(process.study.as_deref(), Some("Pilot Study"));
        assert_eq!(process.columns, vec!["GSR=0-2", "Survey=4,5"]);
        assert!(process.discard);
        assert_eq!(process.logging.get_log_level(), "debug");
        assert_eq!(process.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_discard_conflicts_with_keep() {
        let result = Args::try_parse_from(["imotions-cleaner", "process", "--discard", "--keep"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_detect_requires_files() {
        assert!(Args::try_parse_from(["imotions-cleaner", "detect"]).is_err());

        let args = Args::try_parse_from(["imotions-cleaner", "detect", "a.csv", "b.csv"]).unwrap();
        let Some(Commands::Detect(detect)) = args.command else {
            panic!("expected detect command");
        };
        assert_eq!(detect.files.len(), 2);
    }

    #[test]
    fn test_log_levels() {
        let quiet = LoggingArgs {
            verbose: 0,
            quiet: true,
        };
        assert_eq!(quiet.get_log_level(), "error");
        assert!(!quiet.show_progress());
        assert_eq!(LoggingArgs::default().get_log_level(), "warn");
    }

    #[test]
    fn test_process_args_validation() {
        let temp_dir = TempDir::new().unwrap();
        let base = Args::parse_from(["imotions-cleaner", "process"]);
        let Some(Commands::Process(mut process)) = base.command else {
            panic!("expected process command");
        };

        process.input_path = Some(temp_dir.path().to_path_buf());
        assert!(process.validate().is_ok());

        process.input_path = Some(temp_dir.path().join("missing"));
        assert!(matches!(
            process.validate(),
            Err(CleanerError::ImportRootNotFound { .. })
        ));

        process.input_path = None;
        process.select_columns = true;
        process.yes = true;
        assert!(process.validate().is_err());
    }
}
