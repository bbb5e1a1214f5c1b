//! Ingest Service - Merges yearly occurrence exports and loads them into the store
//!
//! Usage:
//!   # Merge ./data/*.csv if stale, then load into Postgres if the table is empty:
//!   cargo run --bin ingest
//!
//!   # Clear the table first and reload from the canonical dataset:
//!   cargo run --bin ingest -- --reset
//!
//!   # Parse and validate only, using an in-memory store:
//!   cargo run --bin ingest -- --dry-run

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

use ingest::config::Config;
use ingest::logging::init_logging;
use ingest::{
    CsvMerger, IngestError, LoadReport, Loader, MemoryStore, MergeOutcome, OccurrenceStore,
    PgStore, RecordSanitizer,
};

#[derive(Parser, Debug)]
#[command(name = "ingest", about = "Merges yearly CSV exports and loads occurrences")]
struct Args {
    /// Directory holding the yearly source CSVs (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Canonical merged CSV path (overrides MERGED_FILE)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Do not merge, load the existing canonical dataset as is
    #[arg(long, default_value = "false")]
    skip_merge: bool,

    /// Clear the store before loading
    #[arg(long, default_value = "false")]
    reset: bool,

    /// Dry run - load into memory only, nothing is saved
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Reject Brazilian rows outside the country's bounding box
    #[arg(long, default_value = "false")]
    strict_bounds: bool,
}

fn describe_merge(outcome: &MergeOutcome) {
    match outcome {
        MergeOutcome::UpToDate { year } => {
            info!(year, "Merge skipped, canonical dataset already covers the newest year");
        }
        MergeOutcome::Merged {
            files,
            rows,
            skipped_files,
        } => {
            info!(files, rows, skipped = skipped_files.len(), "Merge complete");
            for path in skipped_files {
                warn!(file = %path.display(), "Source file was skipped");
            }
        }
        MergeOutcome::NothingToMerge { skipped_files } => {
            warn!(skipped = skipped_files.len(), "No source produced data");
        }
    }
}

async fn run_load<S: OccurrenceStore + ?Sized>(
    store: &S,
    config: &Config,
    reset: bool,
) -> Result<LoadReport> {
    let loader = Loader::new(store, RecordSanitizer::new(config.strict_country_bounds));
    if reset {
        loader.reset().await.context("Failed to clear store")?;
    }
    let report = loader
        .load(&config.merged_file)
        .await
        .context("Failed to load canonical dataset")?;
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(dir) = args.data_dir {
        config.merged_file = args
            .output
            .clone()
            .unwrap_or_else(|| dir.join(ingest::merge::DEFAULT_MERGED_FILE_NAME));
        config.data_dir = dir;
    } else if let Some(output) = args.output {
        config.merged_file = output;
    }
    config.strict_country_bounds |= args.strict_bounds;

    info!("=== Focos Ingest ===");
    info!(data_dir = %config.data_dir.display(), merged_file = %config.merged_file.display());
    info!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    if !args.skip_merge {
        let merger = CsvMerger::new(&config.data_dir, &config.merged_file);
        match merger.merge() {
            Ok(outcome) => describe_merge(&outcome),
            Err(IngestError::NoSourceFiles(dir)) => {
                warn!(dir = %dir.display(), "No source CSV files found");
            }
            Err(e) => error!(error = %e, "Merge failed"),
        }
    }

    if !config.merged_file.exists() {
        error!(path = %config.merged_file.display(), "Canonical dataset does not exist, nothing to load");
        println!("\n=== Ingest Complete ===");
        println!("Rows processed: 0");
        return Ok(());
    }

    let report = if args.dry_run {
        let store = MemoryStore::new();
        run_load(&store, &config, false).await?
    } else {
        let db_url = config
            .db_url
            .as_deref()
            .context("DB_URL env var missing (use --dry-run to skip the database)")?;
        let store = PgStore::connect(db_url, config.db_max_connections)
            .await
            .context("Failed to connect to database")?;
        store
            .ensure_schema()
            .await
            .context("Failed to prepare occurrences table")?;
        run_load(&store, &config, args.reset).await?
    };

    println!("\n=== Ingest Complete ===");
    if report.already_populated {
        println!("Store already populated - nothing loaded (use --reset to reload)");
    } else {
        println!("Rows processed: {}", report.rows_processed);
        println!("Records saved:  {}", report.saved);
        println!("Rows skipped:   {}", report.skipped);
    }
    if args.dry_run {
        println!("Dry run - nothing saved to database");
    }

    Ok(())
}
