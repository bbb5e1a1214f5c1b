//! Record store abstraction.
//!
//! The core only ever needs bulk insert, full scan, count and clear-all;
//! grouping and filtering happen in memory.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::record::{ObservedOn, Occurrence};

/// Rows per INSERT statement; 10 binds each keeps us far below the protocol limit.
const INSERT_CHUNK: usize = 1_000;

#[async_trait]
pub trait OccurrenceStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Occurrence>, StoreError>;

    /// Insert every record in one call; returns how many were stored.
    async fn save_all(&self, records: Vec<Occurrence>) -> Result<usize, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Remove everything; returns how many records were deleted.
    async fn delete_all(&self) -> Result<u64, StoreError>;
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Occurrence>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OccurrenceStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Occurrence>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn save_all(&self, records: Vec<Occurrence>) -> Result<usize, StoreError> {
        let count = records.len();
        self.records.write().await.extend(records);
        Ok(count)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }
}

// =============================================================================
// Postgres store
// =============================================================================

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Row as stored in `occurrences`
#[derive(Debug, sqlx::FromRow)]
struct OccurrenceRow {
    id: i64,
    source_id: String,
    focus_id: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    state: Option<String>,
    municipality: Option<String>,
    biome: Option<String>,
    observed_on: Option<NaiveDate>,
    observed_year: i32,
}

impl TryFrom<OccurrenceRow> for Occurrence {
    type Error = StoreError;

    fn try_from(row: OccurrenceRow) -> Result<Self, Self::Error> {
        let observed_on = match row.observed_on {
            Some(date) => {
                let on = ObservedOn::Day(date);
                if on.year() != row.observed_year {
                    return Err(StoreError::Corrupt {
                        id: row.id,
                        reason: format!(
                            "observed_on {} disagrees with observed_year {}",
                            date, row.observed_year
                        ),
                    });
                }
                on
            }
            None => ObservedOn::Year(row.observed_year),
        };

        Ok(Occurrence {
            source_id: row.source_id,
            focus_id: row.focus_id,
            latitude: row.latitude,
            longitude: row.longitude,
            country: row.country,
            state: row.state,
            municipality: row.municipality,
            biome: row.biome,
            observed_on,
        })
    }
}

impl PgStore {
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `occurrences` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS occurrences (
                id            BIGSERIAL PRIMARY KEY,
                source_id     TEXT NOT NULL,
                focus_id      TEXT NOT NULL,
                latitude      DOUBLE PRECISION NOT NULL,
                longitude     DOUBLE PRECISION NOT NULL,
                country       TEXT,
                state         TEXT,
                municipality  TEXT,
                biome         TEXT,
                observed_on   DATE,
                observed_year INT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OccurrenceStore for PgStore {
    async fn find_all(&self) -> Result<Vec<Occurrence>, StoreError> {
        let rows: Vec<OccurrenceRow> = sqlx::query_as(
            r#"
            SELECT id, source_id, focus_id, latitude, longitude, country, state,
                   municipality, biome, observed_on, observed_year
            FROM occurrences
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Occurrence::try_from).collect()
    }

    async fn save_all(&self, records: Vec<Occurrence>) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for chunk in records.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO occurrences (source_id, focus_id, latitude, longitude, country, \
                 state, municipality, biome, observed_on, observed_year) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.source_id.as_str())
                    .push_bind(record.focus_id.as_str())
                    .push_bind(record.latitude)
                    .push_bind(record.longitude)
                    .push_bind(record.country.as_deref())
                    .push_bind(record.state.as_deref())
                    .push_bind(record.municipality.as_deref())
                    .push_bind(record.biome.as_deref())
                    .push_bind(record.observed_on.date())
                    .push_bind(record.year());
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM occurrences")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM occurrences")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occurrence(year: i32) -> Occurrence {
        Occurrence {
            source_id: "bdq".to_string(),
            focus_id: format!("foco-{year}"),
            latitude: -10.0,
            longitude: -50.0,
            country: Some("Brasil".to_string()),
            state: None,
            municipality: None,
            biome: None,
            observed_on: ObservedOn::Year(year),
        }
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.count().await.unwrap(), 0);

        let saved = store
            .save_all(vec![occurrence(2003), occurrence(2004)])
            .await
            .unwrap();
        assert_eq!(saved, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let all = store.find_all().await.unwrap();
        assert_eq!(all[0].year(), 2003);
        assert_eq!(all[1].year(), 2004);

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_row_conversion_keeps_day_precision() {
        let row = OccurrenceRow {
            id: 1,
            source_id: "a".to_string(),
            focus_id: "b".to_string(),
            latitude: -3.0,
            longitude: -60.0,
            country: None,
            state: None,
            municipality: None,
            biome: Some("Amazonia".to_string()),
            observed_on: NaiveDate::from_ymd_opt(2011, 9, 3),
            observed_year: 2011,
        };
        let record = Occurrence::try_from(row).unwrap();
        assert_eq!(record.month(), Some(9));
    }

    #[test]
    fn test_row_conversion_year_only() {
        let row = OccurrenceRow {
            id: 2,
            source_id: "a".to_string(),
            focus_id: "b".to_string(),
            latitude: -3.0,
            longitude: -60.0,
            country: None,
            state: None,
            municipality: None,
            biome: None,
            observed_on: None,
            observed_year: 2003,
        };
        let record = Occurrence::try_from(row).unwrap();
        assert_eq!(record.observed_on, ObservedOn::Year(2003));
    }

    #[test]
    fn test_row_conversion_rejects_mismatched_year() {
        let row = OccurrenceRow {
            id: 3,
            source_id: "a".to_string(),
            focus_id: "b".to_string(),
            latitude: -3.0,
            longitude: -60.0,
            country: None,
            state: None,
            municipality: None,
            biome: None,
            observed_on: NaiveDate::from_ymd_opt(2011, 9, 3),
            observed_year: 2012,
        };
        assert!(matches!(
            Occurrence::try_from(row),
            Err(StoreError::Corrupt { id: 3, .. })
        ));
    }
}
