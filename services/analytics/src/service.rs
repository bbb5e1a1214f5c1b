//! Store-backed entry point for the analytical queries.
//!
//! Each call takes a fresh snapshot of the store; nothing is cached.

use ingest::{Occurrence, OccurrenceStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::aggregate::{self, Season};
use crate::error::Result;
use crate::order::Ranked;
use crate::trend::{self, Forecast, HorizonForecast};

pub struct AnalysisService<S: OccurrenceStore + ?Sized> {
    store: Arc<S>,
}

impl<S: OccurrenceStore + ?Sized> Clone for AnalysisService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: OccurrenceStore + ?Sized> AnalysisService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn snapshot(&self) -> Result<Vec<Occurrence>> {
        let records = self.store.find_all().await?;
        debug!(records = records.len(), "Scanned store");
        Ok(records)
    }

    pub async fn years_ascending(&self) -> Result<Vec<i32>> {
        Ok(aggregate::years_ascending(&self.snapshot().await?))
    }

    pub async fn count_by_year(&self) -> Result<BTreeMap<i32, u64>> {
        Ok(aggregate::count_by_year(&self.snapshot().await?))
    }

    pub async fn biomes_alphabetical(&self) -> Result<Vec<String>> {
        Ok(aggregate::biomes_alphabetical(&self.snapshot().await?))
    }

    pub async fn count_by_biome(&self) -> Result<BTreeMap<String, u64>> {
        Ok(aggregate::count_by_biome(&self.snapshot().await?))
    }

    pub async fn count_by_month(&self) -> Result<BTreeMap<u32, u64>> {
        Ok(aggregate::count_by_month(&self.snapshot().await?))
    }

    pub async fn count_by_season(&self) -> Result<BTreeMap<Season, u64>> {
        Ok(aggregate::count_by_season(&self.snapshot().await?))
    }

    pub async fn season_with_most_occurrences(&self) -> Result<Option<(Season, u64)>> {
        Ok(aggregate::season_with_most_occurrences(&self.snapshot().await?))
    }

    pub async fn growth_percent_by_year(&self) -> Result<BTreeMap<i32, f64>> {
        Ok(aggregate::growth_percent_by_year(&self.snapshot().await?))
    }

    pub async fn overall_change_percent(&self) -> Result<f64> {
        Ok(aggregate::overall_change_percent(&self.snapshot().await?))
    }

    pub async fn top_municipalities(&self, limit: usize) -> Result<Vec<Ranked>> {
        Ok(aggregate::top_municipalities(&self.snapshot().await?, limit))
    }

    pub async fn top_states(&self, limit: usize) -> Result<Vec<Ranked>> {
        Ok(aggregate::top_states(&self.snapshot().await?, limit))
    }

    pub async fn forecast_next(&self) -> Result<Forecast> {
        let counts = self.count_by_year().await?;
        trend::forecast_next(&counts)
    }

    pub async fn forecast_horizon(&self, years: u32) -> Result<BTreeMap<i32, HorizonForecast>> {
        let counts = self.count_by_year().await?;
        trend::forecast_horizon(&counts, years)
    }
}
