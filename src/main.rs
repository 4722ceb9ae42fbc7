use clap::Parser;
use imotions_cleaner::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("iMotions Export Cleaner - Sensor Export Normalizer");
    println!("==================================================");
    println!();
    println!("Copy an iMotions export tree, rename its sensor folders and files,");
    println!("and extract clean CSV files holding only the selected columns.");
    println!();
    println!("USAGE:");
    println!("    imotions-cleaner <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    process     Copy, classify and clean a study export (main command)");
    println!("    classify    Classify and rename sensor folders in place");
    println!("    detect      Show where the data table starts in export files");
    println!("    surveys     Score survey exports into RESULT.csv");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Pick the import and export folders interactively");
    println!("    imotions-cleaner process");
    println!();
    println!("    # Non-interactive run with a narrowed GSR selection");
    println!("    imotions-cleaner process -i ./iMotions_results -e ./Pilot_Exports --columns GSR=0-2 --yes");
    println!();
    println!("    # Inspect boundary detection for a single file");
    println!("    imotions-cleaner detect Data/GSR/GSR_001.csv");
    println!();
    println!("For detailed help on any command, use:");
    println!("    imotions-cleaner <COMMAND> --help");
}
