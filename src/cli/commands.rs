//! Command implementations for the export cleaner CLI
//!
//! This module contains the command execution logic, logging setup,
//! progress reporting and run reports for every subcommand.

use crate::boundary::BoundaryDetector;
use crate::classifier::{ClassificationReport, SensorClassifier};
use crate::cli::args::{
    Args, ClassifyArgs, Commands, DetectArgs, LoggingArgs, OutputFormat, ProcessArgs, SurveysArgs,
};
use crate::cli::input::{
    InteractiveSelection, export_options, prompt_confirmation, prompt_study_name,
    select_export_root, select_import_root,
};
use crate::columns::{PresetSelection, SelectionSource};
use crate::config::CleanerConfig;
use crate::constants::{DATA_DIR_NAME, DEFAULT_STUDY_NAME, SURVEY_RESULT_FILE};
use crate::models::{Detection, FileReport, FileStatus, RunSummary};
use crate::processor::{NoopObserver, ProgressObserver, StudyProcessor};
use crate::survey::{SurveySummary, summarize_directory};
use anyhow::{Context, Result};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main command runner
pub fn run(args: Args) -> Result<()> {
    let Some(command) = args.command else {
        return Ok(());
    };

    setup_logging(command.logging())?;
    debug!("Command line arguments: {:?}", command);

    match command {
        Commands::Process(args) => run_process(args),
        Commands::Classify(args) => run_classify(args),
        Commands::Detect(args) => run_detect(args),
        Commands::Surveys(args) => run_surveys(args),
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(logging: &LoggingArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = logging.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("imotions_cleaner={}", log_level)));

    if logging.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load the sensor table and apply command-line overrides
pub fn load_configuration(args: &ProcessArgs) -> Result<CleanerConfig> {
    info!("Loading configuration");
    let mut config = CleanerConfig::load_layered(args.config_file.as_deref())?;

    if args.preserve_preamble {
        config = config.with_preserve_preamble(true);
    }

    Ok(config)
}

/// Full pipeline: copy, classify, extract, report
fn run_process(args: ProcessArgs) -> Result<()> {
    args.validate()?;
    let config = load_configuration(&args)?;
    let interactive = args.interactive();

    let import_root = match &args.input_path {
        Some(path) => path.clone(),
        None if interactive => {
            let home = dirs::home_dir().context("Could not determine the home directory")?;
            select_import_root(&home)?
        }
        None => anyhow::bail!("No import root given. Pass --input or drop --yes to choose one."),
    };

    let export_root = resolve_export_root(&args)?;
    let discard = resolve_discard(&args, &export_root)?;
    info!(
        "Import root {}, export root {}",
        import_root.display(),
        export_root.display()
    );

    let mut selection: Box<dyn SelectionSource> = if args.select_columns {
        Box::new(InteractiveSelection)
    } else {
        Box::new(PresetSelection::from_assignments(&args.columns))
    };

    let show_progress =
        args.logging.show_progress() && args.output_format == OutputFormat::Human;
    let mut progress = ProgressReporter::default();
    let mut noop = NoopObserver;
    let observer: &mut dyn ProgressObserver = if show_progress {
        &mut progress
    } else {
        &mut noop
    };

    let processor = StudyProcessor::new(&config, &export_root);
    let summary = processor.run(&import_root, discard, selection.as_mut(), observer)?;

    match args.output_format {
        OutputFormat::Human => generate_human_report(&summary),
        OutputFormat::Json => generate_json_report(&summary),
    }
}

/// Export root from `--export`, else a study folder chosen by prompt or the first candidate
fn resolve_export_root(args: &ProcessArgs) -> Result<PathBuf> {
    if let Some(path) = &args.export_path {
        return Ok(path.clone());
    }

    let interactive = args.interactive();
    let study = match &args.study {
        Some(study) => study.clone(),
        None if interactive => prompt_study_name()?,
        None => String::new(),
    };
    let study = if study.trim().is_empty() {
        DEFAULT_STUDY_NAME.to_string()
    } else {
        study.trim().to_string()
    };

    if interactive {
        return select_export_root(&study);
    }

    export_options(&study)
        .into_iter()
        .next()
        .context("Could not determine a user directory for exports. Pass --export instead.")
}

/// Whether an existing working copy is replaced
fn resolve_discard(args: &ProcessArgs, export_root: &Path) -> Result<bool> {
    if args.discard {
        return Ok(true);
    }
    if args.keep || !args.interactive() || !export_root.join(DATA_DIR_NAME).exists() {
        return Ok(false);
    }
    prompt_confirmation("Do you want to delete the previous data?", false)
}

/// Classify and rename the folders of a data directory in place
fn run_classify(args: ClassifyArgs) -> Result<()> {
    let config = CleanerConfig::load_layered(args.config_file.as_deref())?;
    let report = SensorClassifier::new(&config).organize(&args.data_dir)?;

    match args.output_format {
        OutputFormat::Human => print_classification(&report),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn print_classification(report: &ClassificationReport) {
    println!("\n{}", "Sensor folders".bright_green().bold());
    for folder in &report.sensor_folders {
        println!(
            "   • {}: {}",
            folder.sensor.bright_white(),
            folder.path.display().to_string().bright_cyan()
        );
    }
    println!(
        "   {} folders renamed, {} files renamed",
        report.folders_renamed, report.files_renamed
    );
    print_warnings(report.warnings.iter().map(ToString::to_string));
}

/// Print the detected data boundary of each file
fn run_detect(args: DetectArgs) -> Result<()> {
    let config = CleanerConfig::load_layered(args.config_file.as_deref())?;
    let detector = BoundaryDetector::new(&config.detection);
    let detections: Vec<(PathBuf, Detection)> = args
        .files
        .iter()
        .map(|file| (file.clone(), detector.detect(file)))
        .collect();

    match args.output_format {
        OutputFormat::Human => {
            for (file, detection) in &detections {
                println!("{}", describe_detection(file, detection));
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = detections
                .iter()
                .map(|(file, detection)| {
                    serde_json::json!({
                        "file": file,
                        "detection": detection,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}

/// One-line description of a detection result
pub fn describe_detection(file: &Path, detection: &Detection) -> String {
    let name = file.display().to_string().bright_cyan();
    match detection {
        Detection::Found(boundary) => {
            let mut line = format!(
                "{}: data starts at row {} (marker '{}' at row {})",
                name, boundary.data_start, boundary.marker, boundary.marker_row
            );
            if boundary.forced_split {
                line.push_str(", re-read without quoting");
            }
            line
        }
        Detection::NotFound(reason) => {
            format!("{}: {} ({})", name, "no data boundary".bright_yellow(), reason)
        }
    }
}

/// Score a directory of survey exports
fn run_surveys(args: SurveysArgs) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.dir.join(SURVEY_RESULT_FILE));
    let summary = summarize_directory(&args.dir, &output)?;
    print_survey_summary(&summary);
    Ok(())
}

fn print_survey_summary(summary: &SurveySummary) {
    println!("\n{}", "Survey scores".bright_green().bold());
    for score in &summary.scores {
        println!(
            "   • {}: {}/{} correct, {} s left",
            score.participant_id.bright_white(),
            score.correct,
            score.questions,
            score.leftover_time
        );
    }
    println!(
        "   Written to {}",
        summary.output.display().to_string().bright_cyan()
    );
    print_warnings(
        summary
            .skipped
            .iter()
            .map(|(path, reason)| format!("{} skipped: {}", path.display(), reason)),
    );
}

/// Generate human-readable report
fn generate_human_report(summary: &RunSummary) -> Result<()> {
    let duration = HumanDuration(Duration::from_millis(summary.elapsed_ms));

    println!("\n{}", "Export cleaning complete".bright_green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Processing Summary:");
    println!("   • Sensors processed: {}", summary.sensors_processed);
    println!("   • Files cleaned: {}", summary.files_cleaned);
    println!("   • Rows written: {}", summary.rows_written);
    println!("   • Processing time: {}", duration);
    println!(
        "   • Results: {}",
        summary.results_dir.display().to_string().bright_cyan()
    );

    let unprocessed = summary.unprocessed_files();
    if !unprocessed.is_empty() {
        println!(
            "\n{} {}",
            "Files needing attention:".bright_yellow().bold(),
            unprocessed.len()
        );
        for report in unprocessed {
            println!("   • {}", describe_unprocessed(report));
        }
    }

    print_warnings(summary.warnings.iter().map(ToString::to_string));
    println!();
    Ok(())
}

fn describe_unprocessed(report: &FileReport) -> String {
    let status = match &report.status {
        FileStatus::Cleaned => String::new(),
        FileStatus::FallbackCopied { reason } => format!("copied unprocessed ({})", reason),
        FileStatus::Failed { message } => format!("failed ({})", message),
    };
    format!("{} [{}]: {}", report.source.display(), report.sensor, status)
}

/// Generate JSON report for machine consumption
fn generate_json_report(summary: &RunSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

fn print_warnings(warnings: impl Iterator<Item = String>) {
    let warnings: Vec<String> = warnings.collect();
    if warnings.is_empty() {
        return;
    }
    println!("\n{}", "Warnings:".bright_yellow().bold());
    for warning in warnings {
        println!("   • {}", warning);
    }
}

/// Create a progress bar with consistent styling
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} [{per_sec}] ETA: {eta}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}

/// One progress bar per sensor folder
#[derive(Debug, Default)]
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressObserver for ProgressReporter {
    fn folder_started(&mut self, sensor: &str, files: usize) {
        self.bar = Some(create_progress_bar(files as u64, sensor));
    }

    fn file_finished(&mut self, report: &FileReport) {
        if let Some(bar) = &self.bar {
            if !report.status.is_cleaned() {
                bar.println(format!(
                    "{} {}",
                    "!".bright_yellow().bold(),
                    describe_unprocessed(report)
                ));
            }
            bar.inc(1);
        }
    }

    fn folder_finished(&mut self, sensor: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("{} done", sensor));
        }
    }
}
