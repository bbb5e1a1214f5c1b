//! Consolidates yearly source CSVs into one canonical dataset.
//!
//! The canonical file is rewritten only when the year of its last data row
//! differs from the newest year encoded in the source filenames.

use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::date::parse_observed_on;
use crate::error::{IngestError, Result};
use crate::record::COL_DATE;

pub const DEFAULT_MERGED_FILE_NAME: &str = "focos_merged.csv";

const MIN_PLAUSIBLE_YEAR: i32 = 2000;
const MAX_PLAUSIBLE_YEAR: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The canonical file already ends in the freshest source year.
    UpToDate { year: i32 },
    Merged {
        files: usize,
        rows: usize,
        skipped_files: Vec<PathBuf>,
    },
    /// Every source was empty or unreadable; the canonical file was left alone.
    NothingToMerge { skipped_files: Vec<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct CsvMerger {
    source_dir: PathBuf,
    output: PathBuf,
}

impl CsvMerger {
    pub fn new(source_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output: output.into(),
        }
    }

    /// Candidate `*.csv` files sorted by filename, excluding the canonical output.
    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        // only an existing output can show up in the listing
        let output = fs::canonicalize(&self.output).ok();
        let entries =
            fs::read_dir(&self.source_dir).map_err(|e| IngestError::io(&self.source_dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| IngestError::io(&self.source_dir, e))?.path();
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() || is_same_file(&path, output.as_deref()) {
                continue;
            }
            files.push(path);
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    pub fn merge(&self) -> Result<MergeOutcome> {
        let files = self.source_files()?;
        if files.is_empty() {
            return Err(IngestError::NoSourceFiles(self.source_dir.clone()));
        }

        let freshest = freshness_marker(&files);
        info!(
            files = files.len(),
            freshest_year = ?freshest,
            "Found source files"
        );

        if self.output.exists() {
            match last_row_year(&self.output) {
                Ok(Some(year)) if Some(year) == freshest => {
                    info!(year, output = %self.output.display(), "Canonical dataset is up to date");
                    return Ok(MergeOutcome::UpToDate { year });
                }
                Ok(last) => {
                    info!(last_year = ?last, freshest_year = ?freshest, "Canonical dataset is stale, re-merging");
                }
                Err(e) => {
                    warn!(error = %e, "Cannot read canonical dataset, re-merging");
                }
            }
        }

        self.remerge(&files)
    }

    fn remerge(&self, files: &[PathBuf]) -> Result<MergeOutcome> {
        // removed on drop, so an early return leaves nothing behind
        let dir = output_dir(&self.output);
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| IngestError::io(dir, e))?;
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut tmp);

        let mut header_written = false;
        let mut merged_files = 0;
        let mut rows = 0;
        let mut skipped_files = Vec::new();

        for path in files {
            let (header, data) = match read_rows(path) {
                Ok(Some(parts)) => parts,
                Ok(None) => {
                    debug!(file = %path.display(), "Source file is empty");
                    continue;
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping unreadable source file");
                    skipped_files.push(path.clone());
                    continue;
                }
            };

            if !header_written {
                writer.write_record(&header)?;
                header_written = true;
            }
            for record in &data {
                writer.write_record(record)?;
            }

            info!(file = %path.display(), rows = data.len(), "Merged source file");
            rows += data.len();
            merged_files += 1;
        }

        writer.flush().map_err(|e| IngestError::io(&self.output, e))?;
        drop(writer);

        if !header_written {
            warn!("No source file contributed a header, canonical dataset left untouched");
            return Ok(MergeOutcome::NothingToMerge { skipped_files });
        }

        tmp.persist(&self.output)
            .map_err(|e| IngestError::io(&self.output, e.error))?;
        info!(
            files = merged_files,
            rows,
            output = %self.output.display(),
            "Canonical dataset written"
        );

        Ok(MergeOutcome::Merged {
            files: merged_files,
            rows,
            skipped_files,
        })
    }
}

/// Largest plausible 4-digit year found in a filename.
pub fn year_in_file_name(name: &str) -> Option<i32> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .filter(|year| (MIN_PLAUSIBLE_YEAR..=MAX_PLAUSIBLE_YEAR).contains(year))
        .max()
}

/// The newest year referenced by any source filename.
pub fn freshness_marker(files: &[PathBuf]) -> Option<i32> {
    files
        .iter()
        .filter_map(|path| path.file_name()?.to_str())
        .filter_map(year_in_file_name)
        .max()
}

/// Year of the last data row in a CSV with a header, if any row has a usable date.
pub fn last_row_year(path: &Path) -> Result<Option<i32>> {
    let text = read_source_text(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut last: Option<StringRecord> = None;
    for record in reader.records() {
        last = Some(record?);
    }

    Ok(last
        .as_ref()
        .and_then(|record| record.get(COL_DATE))
        .and_then(|raw| parse_observed_on(raw).ok())
        .map(|on| on.year()))
}

/// Read a source file as text: UTF-8 (BOM stripped), falling back to Windows-1252.
pub fn read_source_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| IngestError::io(path, e))?;
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(&bytes);
    if !had_errors {
        return Ok(text.into_owned());
    }

    debug!(file = %path.display(), "Not valid UTF-8, decoding as Windows-1252");
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
    Ok(text.into_owned())
}

/// Header and data rows of one source, or None when the file has no header.
fn read_rows(path: &Path) -> Result<Option<(StringRecord, Vec<StringRecord>)>> {
    let text = read_source_text(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Ok(None),
    };

    let data = records.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Some((header, data)))
}

fn is_same_file(path: &Path, canonical_output: Option<&Path>) -> bool {
    match canonical_output {
        Some(output) => fs::canonicalize(path).is_ok_and(|p| p == output),
        None => false,
    }
}

/// Directory the canonical file lives in; the temp file must share its filesystem.
fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
