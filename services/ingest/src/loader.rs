//! Populates the record store from the canonical dataset.
//!
//! Policy: load only into an empty store. Rows that fail sanitization or date
//! parsing are counted and skipped; the batch always completes.

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::date::parse_observed_on;
use crate::error::Result;
use crate::merge::read_source_text;
use crate::record::{ObservedOn, Occurrence};
use crate::sanitize::{RecordSanitizer, SanitizedRow};
use crate::store::OccurrenceStore;

/// How many per-row problems are logged individually.
const MAX_LOGGED_ROW_ERRORS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_processed: usize,
    pub saved: usize,
    pub skipped: usize,
    /// The store already held records, so nothing was read.
    pub already_populated: bool,
}

#[derive(Debug, Default)]
pub struct ParsedDataset {
    pub records: Vec<Occurrence>,
    pub rows_processed: usize,
    pub row_errors: Vec<String>,
}

/// Convert canonical CSV content into occurrences.
/// Same content and sanitizer policy always yield the same records in the same order.
pub fn parse_dataset(content: &str, sanitizer: &RecordSanitizer) -> ParsedDataset {
    let mut parsed = ParsedDataset::default();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2; // 1-indexed, after the header
        parsed.rows_processed += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                parsed.row_errors.push(format!("Line {}: {}", line, e));
                continue;
            }
        };

        let row = match sanitizer.sanitize(&record, line) {
            Ok(row) => row,
            Err(e) => {
                parsed.row_errors.push(format!("Line {}: {}", line, e));
                continue;
            }
        };

        match parse_observed_on(&row.raw_date) {
            Ok(observed_on) => parsed.records.push(build_occurrence(row, observed_on)),
            Err(e) => parsed.row_errors.push(format!("Line {}: {}", line, e)),
        }
    }

    parsed
}

fn build_occurrence(row: SanitizedRow, observed_on: ObservedOn) -> Occurrence {
    Occurrence {
        source_id: row.source_id,
        focus_id: row.focus_id,
        latitude: row.latitude,
        longitude: row.longitude,
        country: row.country,
        state: row.state,
        municipality: row.municipality,
        biome: row.biome,
        observed_on,
    }
}

pub struct Loader<'a, S: OccurrenceStore + ?Sized> {
    store: &'a S,
    sanitizer: RecordSanitizer,
}

impl<'a, S: OccurrenceStore + ?Sized> Loader<'a, S> {
    pub fn new(store: &'a S, sanitizer: RecordSanitizer) -> Self {
        Self { store, sanitizer }
    }

    pub async fn load(&self, dataset: &Path) -> Result<LoadReport> {
        let existing = self.store.count().await?;
        if existing > 0 {
            info!(existing, "Store already populated, skipping load");
            return Ok(LoadReport {
                already_populated: true,
                ..LoadReport::default()
            });
        }

        info!(dataset = %dataset.display(), "Loading canonical dataset");
        let content = read_source_text(dataset)?;
        self.load_content(&content).await
    }

    pub async fn load_content(&self, content: &str) -> Result<LoadReport> {
        let parsed = parse_dataset(content, &self.sanitizer);
        log_row_errors(&parsed.row_errors);

        let skipped = parsed.row_errors.len();
        let rows_processed = parsed.rows_processed;
        let saved = if parsed.records.is_empty() {
            0
        } else {
            self.store.save_all(parsed.records).await?
        };

        info!(rows_processed, saved, skipped, "Load complete");
        Ok(LoadReport {
            rows_processed,
            saved,
            skipped,
            already_populated: false,
        })
    }

    /// Explicit full clear, used before a forced reload.
    pub async fn reset(&self) -> Result<u64> {
        let removed = self.store.delete_all().await?;
        info!(removed, "Store cleared");
        Ok(removed)
    }
}

fn log_row_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    warn!(count = errors.len(), "Rows skipped");
    for err in errors.iter().take(MAX_LOGGED_ROW_ERRORS) {
        warn!("  {}", err);
    }
    if errors.len() > MAX_LOGGED_ROW_ERRORS {
        warn!("  ... and {} more", errors.len() - MAX_LOGGED_ROW_ERRORS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    const DATASET: &str = "id_bdq,foco_id,lat,lon,data_pas,pais,estado,municipio,bioma
a,1,-5.0,-50.0,2003-01-10 12:00:00,Brasil,PARA,ALTAMIRA,Amazonia
a,2,\"-6,5\",-51.0,15/07/2003,Brasil,PARA,ALTAMIRA,Amazonia
b,3,-7.0,-52.0,2004,Brasil,MATO GROSSO,SINOP,Cerrado
b,4,0,0,2004-02-02,Brasil,MATO GROSSO,SINOP,Cerrado
b,5,-7.0,-52.0,sem data,Brasil,MATO GROSSO,SINOP,Cerrado
c,6,-7.0
";

    #[test]
    fn test_parse_dataset_counts() {
        let parsed = parse_dataset(DATASET, &RecordSanitizer::default());
        assert_eq!(parsed.rows_processed, 6);
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.row_errors.len(), 3);
    }

    #[test]
    fn test_parse_dataset_builds_records() {
        let parsed = parse_dataset(DATASET, &RecordSanitizer::default());
        let first = &parsed.records[0];
        assert_eq!(first.focus_id, "1");
        assert_eq!(
            first.observed_on,
            ObservedOn::Day(NaiveDate::from_ymd_opt(2003, 1, 10).unwrap())
        );
        assert_eq!(parsed.records[1].latitude, -6.5);
        assert_eq!(parsed.records[2].observed_on, ObservedOn::Year(2004));
        assert_eq!(parsed.records[2].state.as_deref(), Some("MATO GROSSO"));
    }

    #[test]
    fn test_parse_dataset_error_lines() {
        let parsed = parse_dataset(DATASET, &RecordSanitizer::default());
        assert!(parsed.row_errors[0].starts_with("Line 5:"));
        assert!(parsed.row_errors[1].starts_with("Line 6:"));
        assert!(parsed.row_errors[2].starts_with("Line 7:"));
    }

    #[test]
    fn test_parse_dataset_determinism() {
        let baseline = parse_dataset(DATASET, &RecordSanitizer::default());
        for _ in 0..5 {
            let again = parse_dataset(DATASET, &RecordSanitizer::default());
            assert_eq!(baseline.records, again.records);
        }
    }

    #[test]
    fn test_header_only_dataset() {
        let parsed = parse_dataset(
            "id_bdq,foco_id,lat,lon,data_pas,pais,estado,municipio,bioma\n",
            &RecordSanitizer::default(),
        );
        assert_eq!(parsed.rows_processed, 0);
        assert!(parsed.records.is_empty());
    }

    #[tokio::test]
    async fn test_load_into_empty_store() {
        let store = MemoryStore::new();
        let report = Loader::new(&store, RecordSanitizer::default())
            .load_content(DATASET)
            .await
            .unwrap();

        assert_eq!(
            report,
            LoadReport {
                rows_processed: 6,
                saved: 3,
                skipped: 3,
                already_populated: false
            }
        );
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_second_load_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("focos_merged.csv");
        fs::write(&path, DATASET).unwrap();

        let store = MemoryStore::new();
        let loader = Loader::new(&store, RecordSanitizer::default());
        loader.load(&path).await.unwrap();
        let before = store.count().await.unwrap();

        let report = loader.load(&path).await.unwrap();
        assert!(report.already_populated);
        assert_eq!(report.saved, 0);
        assert_eq!(store.count().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_reset_then_load_reloads_everything() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("focos_merged.csv");
        fs::write(&path, DATASET).unwrap();

        let store = MemoryStore::new();
        let loader = Loader::new(&store, RecordSanitizer::default());
        loader.load(&path).await.unwrap();

        assert_eq!(loader.reset().await.unwrap(), 3);
        let report = loader.load(&path).await.unwrap();
        assert_eq!(report.saved, 3);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_dataset_is_an_error() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new();
        let result = Loader::new(&store, RecordSanitizer::default())
            .load(&dir.path().join("absent.csv"))
            .await;
        assert!(result.is_err());
    }
}
