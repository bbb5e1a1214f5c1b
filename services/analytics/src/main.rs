//! Analytics Service - Answers aggregate questions over loaded occurrences
//!
//! Queries:
//! - years, by-year, biomes, by-biome, by-month, by-season, peak-season
//! - growth, change
//! - top-municipalities --limit N, top-states --limit N
//! - forecast, forecast-range --years N
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use analytics::trend::MAX_HORIZON_YEARS;
use analytics::AnalysisService;
use ingest::config::Config;
use ingest::logging::init_logging;
use ingest::merge::read_source_text;
use ingest::{Loader, MemoryStore, OccurrenceStore, PgStore, RecordSanitizer};

#[derive(Parser, Debug)]
#[command(name = "analytics", about = "Aggregates and forecasts occurrence records")]
struct Args {
    /// Analyse a canonical CSV in memory instead of querying the database
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    query: Query,
}

#[derive(Subcommand, Debug)]
enum Query {
    /// Distinct years, ascending
    Years,
    /// Occurrences per year
    ByYear,
    /// Distinct biomes, alphabetical
    Biomes,
    /// Occurrences per biome
    ByBiome,
    /// Occurrences per month (1-12)
    ByMonth,
    /// Occurrences per southern-hemisphere season
    BySeason,
    /// Season with the most occurrences
    PeakSeason,
    /// Percent growth against the previous year present
    Growth,
    /// Percent change from the first to the last year
    Change,
    /// Municipalities with the most occurrences
    TopMunicipalities {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// States with the most occurrences
    TopStates {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Forecast for the year after the last one observed
    Forecast,
    /// Forecasts for each of the next N years
    ForecastRange {
        #[arg(
            long,
            default_value_t = 5,
            value_parser = clap::value_parser!(u32).range(1..=MAX_HORIZON_YEARS as i64)
        )]
        years: u32,
    },
}

// ============================================================================
// Query dispatch
// ============================================================================

async fn run_query<S: OccurrenceStore + ?Sized>(
    service: &AnalysisService<S>,
    query: &Query,
) -> Result<Value> {
    let value = match query {
        Query::Years => serde_json::to_value(service.years_ascending().await?)?,
        Query::ByYear => serde_json::to_value(service.count_by_year().await?)?,
        Query::Biomes => serde_json::to_value(service.biomes_alphabetical().await?)?,
        Query::ByBiome => serde_json::to_value(service.count_by_biome().await?)?,
        Query::ByMonth => serde_json::to_value(service.count_by_month().await?)?,
        Query::BySeason => serde_json::to_value(service.count_by_season().await?)?,
        Query::PeakSeason => match service.season_with_most_occurrences().await? {
            Some((season, count)) => json!({ "season": season.to_string(), "count": count }),
            None => Value::Null,
        },
        Query::Growth => serde_json::to_value(service.growth_percent_by_year().await?)?,
        Query::Change => json!({ "change_percent": service.overall_change_percent().await? }),
        Query::TopMunicipalities { limit } => {
            serde_json::to_value(service.top_municipalities(*limit).await?)?
        }
        Query::TopStates { limit } => serde_json::to_value(service.top_states(*limit).await?)?,
        Query::Forecast => serde_json::to_value(service.forecast_next().await?)?,
        Query::ForecastRange { years } => {
            serde_json::to_value(service.forecast_horizon(*years).await?)?
        }
    };
    Ok(value)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let args = Args::parse();
    let config = Config::from_env();

    let value = if let Some(path) = &args.dataset {
        info!(dataset = %path.display(), "Analysing dataset in memory");
        let content = read_source_text(path).context("Failed to read dataset")?;
        let store = MemoryStore::new();
        Loader::new(&store, RecordSanitizer::new(config.strict_country_bounds))
            .load_content(&content)
            .await
            .context("Failed to load dataset")?;
        run_query(&AnalysisService::new(Arc::new(store)), &args.query).await?
    } else {
        let db_url = config
            .db_url
            .as_deref()
            .context("DB_URL env var missing (or pass --dataset)")?;
        let store = PgStore::connect(db_url, config.db_max_connections)
            .await
            .context("Failed to connect to database")?;
        run_query(&AnalysisService::new(Arc::new(store)), &args.query).await?
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
