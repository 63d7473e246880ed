// src/main.rs
mod batch;
mod extractors;
mod storage;
mod utils;

use std::path::PathBuf;

use batch::RunSummary;
use clap::Parser;
use extractors::TableId;
use storage::StorageManager;
use utils::AppError;

/// Tables requested when none are given on the command line.
const DEFAULT_TABLES: [&str; 7] = ["9.01", "10.01", "10.02", "10.03", "10.04", "10.05", "10.06"];

/// Break named tables out of a model PRN report into separate text files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PRN report file produced by the model run
    #[arg(short, long)]
    report: PathBuf,

    /// Existing directory that receives one `.txt` file per table
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Table number to extract, e.g. 10.03 (repeatable or comma-separated)
    #[arg(short = 't', long = "table", value_delimiter = ',', default_values = DEFAULT_TABLES)]
    tables: Vec<TableId>,

    /// Write a JSON summary of the per-table outcomes to this file (relative to the output directory)
    #[arg(long)]
    summary_file: Option<PathBuf>,
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    run(args)
}

fn run(args: Args) -> Result<(), AppError> {
    let storage = StorageManager::new(&args.output_dir)?;
    let tables = batch::unique_tables(args.tables);

    let reports = batch::extract_tables(&args.report, &storage, &tables)?;
    for report in &reports {
        println!("Table {}: {}", report.table_id, report.outcome);
    }

    let summary = RunSummary::new(&args.report, storage.base_dir(), reports);
    let failures = summary.write_failures();
    tracing::info!(
        "Processing finished. Written: {}, Requested: {}, Write failures: {}",
        summary.written_count(),
        summary.tables.len(),
        failures
    );

    // A broken summary must not hide tables that failed to write.
    let saved_summary = match &args.summary_file {
        Some(path) => storage.save_summary(path, &summary).map(|_| ()),
        None => Ok(()),
    };
    if let Err(e) = &saved_summary {
        tracing::error!("Failed to save run summary: {}", e);
    }

    if failures > 0 {
        return Err(AppError::Processing(format!(
            "{} of {} table(s) could not be written to {}",
            failures,
            summary.tables.len(),
            storage.base_dir().display()
        )));
    }
    saved_summary?;

    Ok(())
}
