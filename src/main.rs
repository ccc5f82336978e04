// src/main.rs
mod converters;
mod extractors;
mod utils;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use converters::{CsvConverter, ExcelConverter, OverwritePolicy};
use extractors::SectionExtractor;
use utils::AppError;

/// Command Line Interface for the markdown/YAML test-case converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert test cases from markdown/YAML to CSV and Excel formats
    Convert {
        /// Input markdown or YAML file path
        #[arg(short, long)]
        input: PathBuf,

        /// Overwrite output files without asking
        #[arg(short = 'F', long)]
        force: bool,

        /// Directory to store output files
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Enable debug mode
        #[arg(short, long)]
        debug: bool,

        /// Show verbose error messages and suggestions
        #[arg(long)]
        verbose: bool,
    },
    /// Display the version information
    Version,
}

fn main() -> Result<(), AppError> {
    let args = Args::parse();

    match args.command {
        Command::Convert {
            input,
            force,
            output_dir,
            debug,
            verbose,
        } => convert(&input, &output_dir, force, debug, verbose),
        Command::Version => {
            println!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn convert(
    input: &Path,
    output_dir: &Path,
    force: bool,
    debug: bool,
    verbose: bool,
) -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var, falls back to the debug flag)
    utils::logging::setup_logging(debug);
    tracing::info!("Processing file: {}", input.display());

    // 2. Boundary checks: the input must exist and carry a known extension
    if !input.exists() {
        tracing::error!("Input file not found: {}", input.display());
        return Err(AppError::Config(format!(
            "Input file not found: {}",
            input.display()
        )));
    }

    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    // 3. Extract test cases in the mode matching the input format
    let extractor = SectionExtractor::new(verbose);
    let test_cases = match extension.as_deref() {
        Some("md") | Some("markdown") => extractor.parse_file(input)?,
        Some("yaml") | Some("yml") => extractor.parse_yaml_file(input)?,
        other => {
            let found = other.unwrap_or("");
            tracing::error!(
                "Unsupported file extension: .{}. Use .md, .markdown, .yaml, or .yml",
                found
            );
            return Err(AppError::Config(format!(
                "Unsupported file extension: .{}",
                found
            )));
        }
    };

    // 4. Nothing extracted is fatal here, not inside the extractor
    if test_cases.iter().all(|(_, cases)| cases.is_empty()) {
        tracing::error!("No valid test cases found");
        return Err(AppError::Processing("No valid test cases found".to_string()));
    }

    let mut policy = if force {
        OverwritePolicy::Force
    } else {
        OverwritePolicy::ask_via_stdin()
    };

    // 5. Convert to CSV files
    let csv_converter = CsvConverter::new(output_dir)?;
    let csv_files = csv_converter.convert(&test_cases, &mut policy);
    if csv_files.is_empty() {
        tracing::warn!("No CSV files created");
    }

    // 6. Convert to a consolidated Excel workbook
    let excel_converter = ExcelConverter::new(output_dir)?;
    if excel_converter.convert(&test_cases, &mut policy).is_none() {
        tracing::warn!("No Excel file created");
    }

    tracing::info!("Conversion completed");
    Ok(())
}
