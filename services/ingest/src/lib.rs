//! Ingestion pipeline for yearly fire/deforestation occurrence exports.
//!
//! Raw yearly CSVs are merged into one canonical dataset ([`merge`]), whose
//! rows are sanitized ([`sanitize`]), dated ([`date`]) and bulk-loaded into an
//! [`store::OccurrenceStore`] ([`loader`]).

pub mod config;
pub mod date;
pub mod error;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod record;
pub mod sanitize;
pub mod store;

pub use error::{IngestError, StoreError};
pub use loader::{LoadReport, Loader};
pub use merge::{CsvMerger, MergeOutcome};
pub use record::{ObservedOn, Occurrence};
pub use sanitize::RecordSanitizer;
pub use store::{MemoryStore, OccurrenceStore, PgStore};
