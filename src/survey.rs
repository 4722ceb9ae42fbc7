//! Survey scoring.
//!
//! Summarizes canonical survey exports into a single table with one row
//! per participant: identifier, fraction of questions answered correctly
//! and total leftover time.
//!
//! Expected file shape:
//!
//! ```text
//! sona_id,12345
//! question_number,question,response,correct_answer,correct,time_left
//! 1,Q1,a,a,1,3.5
//! ```

use crate::constants::{
    SURVEY_CORRECT_COLUMN, SURVEY_FILE_EXTENSION, SURVEY_RESULT_HEADER, SURVEY_TIME_COLUMN,
};
use crate::error::{CleanerError, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Score of one participant's survey file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyScore {
    pub participant_id: String,
    pub questions: usize,
    pub correct: usize,
    pub leftover_time: f64,
}

impl SurveyScore {
    pub fn fraction_correct(&self) -> f64 {
        if self.questions == 0 {
            0.0
        } else {
            self.correct as f64 / self.questions as f64
        }
    }
}

/// Scores written to the summary table plus the files that were skipped
#[derive(Debug, Clone, Default, Serialize)]
pub struct SurveySummary {
    pub output: PathBuf,
    pub scores: Vec<SurveyScore>,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Score one survey export
pub fn score_survey_file(path: &Path) -> Result<SurveyScore> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| CleanerError::csv(path, e))?;

    let mut records = reader.records();
    let participant_id = match records.next() {
        Some(record) => {
            let record = record.map_err(|e| CleanerError::csv(path, e))?;
            record.get(1).map(str::trim).unwrap_or_default().to_string()
        }
        None => String::new(),
    };
    if participant_id.is_empty() {
        return Err(CleanerError::survey_format(
            path,
            "first row does not carry a participant id",
        ));
    }

    // question header
    if records.next().is_none() {
        return Err(CleanerError::survey_format(path, "missing question header"));
    }

    let mut score = SurveyScore {
        participant_id,
        questions: 0,
        correct: 0,
        leftover_time: 0.0,
    };

    for record in records {
        let record = record.map_err(|e| CleanerError::csv(path, e))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let flag = record.get(SURVEY_CORRECT_COLUMN).ok_or_else(|| {
            CleanerError::survey_format(path, format!("line {} has no correctness column", line))
        })?;
        let time = record.get(SURVEY_TIME_COLUMN).map(str::trim).unwrap_or_default();
        let time = if time.is_empty() {
            0.0
        } else {
            time.parse::<f64>().map_err(|_| {
                CleanerError::survey_format(path, format!("line {}: invalid time '{}'", line, time))
            })?
        };

        score.questions += 1;
        if is_truthy(flag) {
            score.correct += 1;
        }
        score.leftover_time += time;
    }

    if score.questions == 0 {
        return Err(CleanerError::survey_format(path, "no questions answered"));
    }

    debug!(
        "{}: {}/{} correct",
        path.display(),
        score.correct,
        score.questions
    );
    Ok(score)
}

/// Score every survey CSV in `dir` and write the summary table to `output`
///
/// Files that cannot be scored are skipped and listed on the summary.
pub fn summarize_directory(dir: &Path, output: &Path) -> Result<SurveySummary> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| CleanerError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.as_path() != output && is_csv(path))
        .collect();
    files.sort();

    info!("Scoring {} survey files in {}", files.len(), dir.display());
    let mut summary = SurveySummary {
        output: output.to_path_buf(),
        ..SurveySummary::default()
    };

    for file in files {
        match score_survey_file(&file) {
            Ok(score) => summary.scores.push(score),
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                summary.skipped.push((file, e.to_string()));
            }
        }
    }

    write_summary(output, &summary.scores)?;
    info!(
        "Wrote {} survey scores to {}",
        summary.scores.len(),
        output.display()
    );
    Ok(summary)
}

fn write_summary(output: &Path, scores: &[SurveyScore]) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| CleanerError::io(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(output).map_err(|e| CleanerError::csv(output, e))?;
    writer
        .write_record(SURVEY_RESULT_HEADER)
        .map_err(|e| CleanerError::csv(output, e))?;
    for score in scores {
        writer
            .write_record([
                score.participant_id.clone(),
                format!("{:.2}", score.fraction_correct()),
                score.leftover_time.to_string(),
            ])
            .map_err(|e| CleanerError::csv(output, e))?;
    }
    writer.flush().map_err(|e| CleanerError::io(output, e))
}

fn is_truthy(flag: &str) -> bool {
    let flag = flag.trim().to_lowercase();
    match flag.as_str() {
        "true" | "t" | "yes" | "y" => true,
        _ => flag.parse::<f64>().is_ok_and(|value| value != 0.0),
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SURVEY_FILE_EXTENSION))
}
