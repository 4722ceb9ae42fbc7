//! User input utilities for interactive CLI prompts
//!
//! Import root discovery and selection, study naming, export folder
//! choice, confirmation prompts and per-sensor column selection.

use crate::columns::{ColumnSelection, SelectionSource};
use crate::constants::{
    IMPORT_DIR_EXCLUSIONS, IMPORT_DIR_KEYWORD, IMPORT_SEARCH_MAX_DEPTH, export_folder_name,
};
use crate::models::SensorType;
use anyhow::{Context, Result};
use colored::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Directories under `search_root` whose names contain the import keyword
///
/// OneDrive, previous export folders, hidden and unreadable directories
/// are not descended into.
pub fn discover_import_roots(search_root: &Path) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = WalkDir::new(search_root)
        .max_depth(IMPORT_SEARCH_MAX_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || is_searchable(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir() && entry.depth() > 0)
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .contains(IMPORT_DIR_KEYWORD)
        })
        .map(DirEntry::into_path)
        .collect();
    roots.sort();
    roots
}

fn is_searchable(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy().to_lowercase();
    entry.file_type().is_dir()
        && !name.starts_with('.')
        && !IMPORT_DIR_EXCLUSIONS
            .iter()
            .any(|excluded| name.contains(excluded))
}

/// Candidate export roots for a study: Downloads, Desktop, Documents
pub fn export_options(study_name: &str) -> Vec<PathBuf> {
    let folder_name = export_folder_name(study_name);
    let mut options: Vec<PathBuf> = [
        dirs::download_dir(),
        dirs::desktop_dir(),
        dirs::document_dir(),
    ]
    .into_iter()
    .flatten()
    .map(|dir| dir.join(&folder_name))
    .collect();

    if options.is_empty() {
        if let Some(home) = dirs::home_dir() {
            options.push(home.join(&folder_name));
        }
    }
    options
}

/// Parse a zero-based menu choice
pub fn parse_choice(input: &str, len: usize) -> Option<usize> {
    input.trim().parse::<usize>().ok().filter(|&choice| choice < len)
}

/// Present discovered import roots and let the user pick one
pub fn select_import_root(search_root: &Path) -> Result<PathBuf> {
    let roots = discover_import_roots(search_root);
    if roots.is_empty() {
        anyhow::bail!(
            "No directories containing '{}' found under {}. Pass --input instead.",
            IMPORT_DIR_KEYWORD,
            search_root.display()
        );
    }

    println!("{}", "Available IMPORT directories:".bright_green().bold());
    print_menu(&roots);
    let choice = prompt_choice("Use directory [number]: ", roots.len())?;
    Ok(roots[choice].clone())
}

/// Ask for the study name; empty input keeps the default
pub fn prompt_study_name() -> Result<String> {
    read_line(&format!("{}", "Please name your study: ".bright_white()))
}

/// Present export folder candidates for a study and let the user pick one
pub fn select_export_root(study_name: &str) -> Result<PathBuf> {
    let options = export_options(study_name);
    if options.is_empty() {
        anyhow::bail!("Could not determine a user directory for exports. Pass --export instead.");
    }

    println!("{}", "Available EXPORT directories:".bright_green().bold());
    print_menu(&options);
    let choice = prompt_choice("Choose directory [number]: ", options.len())?;
    Ok(options[choice].clone())
}

/// Get user confirmation for an action
pub fn prompt_confirmation(message: &str, default_yes: bool) -> Result<bool> {
    let default_text = if default_yes { "Y/n" } else { "y/N" };

    loop {
        let input = read_line(&format!("{} [{}]: ", message, default_text))?.to_lowercase();
        match input.as_str() {
            "" => return Ok(default_yes),
            "y" | "yes" | "1" => return Ok(true),
            "n" | "no" | "0" => return Ok(false),
            _ => println!("Please enter 'y' for yes or 'n' for no."),
        }
    }
}

fn print_menu(paths: &[PathBuf]) {
    for (i, path) in paths.iter().enumerate() {
        println!(
            "  {}. {}",
            i.to_string().bright_yellow().bold(),
            path.display().to_string().bright_cyan()
        );
    }
    println!();
}

fn prompt_choice(prompt: &str, len: usize) -> Result<usize> {
    loop {
        let input = read_line(&format!("{}", prompt.bright_white()))?;
        match parse_choice(&input, len) {
            Some(choice) => return Ok(choice),
            None => println!("Invalid input, please choose 0-{}.", len.saturating_sub(1)),
        }
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    let bytes = io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    if bytes == 0 {
        anyhow::bail!("Input closed while waiting for an answer");
    }
    Ok(input.trim().to_string())
}

/// Asks per sensor whether to narrow the canonical column list
#[derive(Debug, Default)]
pub struct InteractiveSelection;

impl InteractiveSelection {
    fn prompt(&self, sensor: &SensorType) -> Result<ColumnSelection> {
        let manual = prompt_confirmation(
            &format!(
                "Would you like to manually select data columns for '{}'?",
                sensor.name.to_uppercase()
            ),
            false,
        )?;
        if !manual || sensor.columns.is_empty() {
            return Ok(ColumnSelection::defaults(sensor));
        }

        for (i, column) in sensor.columns.iter().enumerate() {
            println!("  {}. {}", i.to_string().bright_yellow(), column);
        }
        let input = read_line(&format!(
            "Provide indices to keep [0-{}], e.g. 0-2,5: ",
            sensor.columns.len() - 1
        ))?;
        Ok(ColumnSelection::from_input(sensor, &input))
    }
}

impl SelectionSource for InteractiveSelection {
    fn select(&mut self, sensor: &SensorType) -> ColumnSelection {
        self.prompt(sensor).unwrap_or_else(|e| {
            warn!(
                "Column selection for {} failed ({}), keeping defaults",
                sensor.name, e
            );
            ColumnSelection::defaults(sensor)
        })
    }
}
