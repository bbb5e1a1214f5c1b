//! Row validation before an occurrence is built.

use csv::StringRecord;

use crate::error::{IngestError, Result};
use crate::record::{
    non_blank, COL_BIOME, COL_COUNTRY, COL_DATE, COL_FOCUS_ID, COL_LATITUDE, COL_LONGITUDE,
    COL_MUNICIPALITY, COL_SOURCE_ID, COL_STATE, MIN_COLUMNS,
};

/// Brazil's bounding box widened by two degrees on every side.
const BRAZIL_LATITUDE: (f64, f64) = (-35.0, 7.0);
const BRAZIL_LONGITUDE: (f64, f64) = (-76.0, -26.0);

/// A row whose cells are trimmed and whose coordinates are known good.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedRow {
    pub source_id: String,
    pub focus_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub raw_date: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub municipality: Option<String>,
    pub biome: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordSanitizer {
    strict_country_bounds: bool,
}

impl RecordSanitizer {
    pub fn new(strict_country_bounds: bool) -> Self {
        Self {
            strict_country_bounds,
        }
    }

    /// `line` is the 1-based line in the source file, used for error reporting.
    pub fn sanitize(&self, record: &StringRecord, line: usize) -> Result<SanitizedRow> {
        if record.len() < MIN_COLUMNS {
            return Err(IngestError::MalformedRow {
                line,
                expected: MIN_COLUMNS,
                found: record.len(),
            });
        }

        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let latitude = parse_coordinate(cell(COL_LATITUDE), "latitude", (-90.0, 90.0))?;
        let longitude = parse_coordinate(cell(COL_LONGITUDE), "longitude", (-180.0, 180.0))?;

        if latitude == 0.0 && longitude == 0.0 {
            return Err(IngestError::InvalidCoordinate(
                "(0, 0) marks a missing position".to_string(),
            ));
        }

        let country = non_blank(cell(COL_COUNTRY));

        if self.strict_country_bounds && country.as_deref().is_some_and(is_brazil) {
            check_range(latitude, "latitude", BRAZIL_LATITUDE)?;
            check_range(longitude, "longitude", BRAZIL_LONGITUDE)?;
        }

        Ok(SanitizedRow {
            source_id: cell(COL_SOURCE_ID).to_string(),
            focus_id: cell(COL_FOCUS_ID).to_string(),
            latitude,
            longitude,
            raw_date: cell(COL_DATE).to_string(),
            country,
            state: non_blank(cell(COL_STATE)),
            municipality: non_blank(cell(COL_MUNICIPALITY)),
            biome: non_blank(cell(COL_BIOME)),
        })
    }
}

/// Parse a coordinate that may use a comma as decimal separator.
pub fn parse_coordinate(raw: &str, axis: &str, bounds: (f64, f64)) -> Result<f64> {
    let normalized = raw.trim().replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| IngestError::InvalidCoordinate(format!("{} '{}' is not a number", axis, raw)))?;

    if !value.is_finite() {
        return Err(IngestError::InvalidCoordinate(format!(
            "{} '{}' is not finite",
            axis, raw
        )));
    }

    check_range(value, axis, bounds)?;
    Ok(value)
}

fn check_range(value: f64, axis: &str, (min, max): (f64, f64)) -> Result<()> {
    if value < min || value > max {
        return Err(IngestError::InvalidCoordinate(format!(
            "{} {} outside [{}, {}]",
            axis, value, min, max
        )));
    }
    Ok(())
}

fn is_brazil(country: &str) -> bool {
    country.eq_ignore_ascii_case("brazil") || country.eq_ignore_ascii_case("brasil")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn amazon_row(lat: &str, lon: &str, country: &str) -> StringRecord {
        row(&[
            "bdq-1", "foco-9", lat, lon, "2020-08-01", country, "PARA", "ALTAMIRA", "Amazonia",
        ])
    }

    #[test]
    fn test_valid_row_is_trimmed() {
        let record = row(&[
            " bdq-1 ", " foco-9", " -3,2041 ", "-52.2100 ", " 2020-08-01 ", "Brasil", " PARA ",
            " ALTAMIRA ", " Amazonia ",
        ]);
        let clean = RecordSanitizer::default().sanitize(&record, 2).unwrap();
        assert_eq!(clean.source_id, "bdq-1");
        assert_eq!(clean.focus_id, "foco-9");
        assert_eq!(clean.latitude, -3.2041);
        assert_eq!(clean.longitude, -52.21);
        assert_eq!(clean.raw_date, "2020-08-01");
        assert_eq!(clean.state.as_deref(), Some("PARA"));
        assert_eq!(clean.municipality.as_deref(), Some("ALTAMIRA"));
        assert_eq!(clean.biome.as_deref(), Some("Amazonia"));
    }

    #[test]
    fn test_blank_location_fields_become_none() {
        let record = row(&["1", "2", "-10.0", "-50.0", "2020", "", " ", "", ""]);
        let clean = RecordSanitizer::default().sanitize(&record, 2).unwrap();
        assert!(clean.country.is_none());
        assert!(clean.state.is_none());
        assert!(clean.municipality.is_none());
        assert!(clean.biome.is_none());
    }

    #[test]
    fn test_short_row_is_malformed() {
        let record = row(&["1", "2", "-10.0", "-50.0", "2020"]);
        let err = RecordSanitizer::default().sanitize(&record, 7).unwrap_err();
        assert!(matches!(
            err,
            IngestError::MalformedRow {
                line: 7,
                expected: 9,
                found: 5
            }
        ));
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let err = RecordSanitizer::default()
            .sanitize(&amazon_row("abc", "-50", "Brasil"), 2)
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_nan_and_infinite_rejected() {
        for bad in ["NaN", "inf", "-infinity"] {
            let err = RecordSanitizer::default()
                .sanitize(&amazon_row(bad, "-50", "Brasil"), 2)
                .unwrap_err();
            assert!(matches!(err, IngestError::InvalidCoordinate(_)), "{bad}");
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        let sanitizer = RecordSanitizer::default();
        assert!(sanitizer.sanitize(&amazon_row("91", "-50", "Brasil"), 2).is_err());
        assert!(sanitizer.sanitize(&amazon_row("-10", "180.5", "Brasil"), 2).is_err());
    }

    #[test]
    fn test_origin_sentinel_rejected() {
        let err = RecordSanitizer::default()
            .sanitize(&amazon_row("0", "0,0", "Brasil"), 2)
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_strict_bounds_only_when_enabled() {
        // Lisbon is a valid coordinate, just not inside Brazil
        let record = amazon_row("38.72", "-9.14", "Brazil");
        assert!(RecordSanitizer::new(false).sanitize(&record, 2).is_ok());
        assert!(RecordSanitizer::new(true).sanitize(&record, 2).is_err());
    }

    #[test]
    fn test_strict_bounds_ignore_other_countries() {
        let record = amazon_row("38.72", "-9.14", "Portugal");
        assert!(RecordSanitizer::new(true).sanitize(&record, 2).is_ok());
    }

    #[test]
    fn test_strict_bounds_tolerance() {
        // Two degrees past the southern tip is still accepted
        let record = amazon_row("-34.9", "-53.0", "Brasil");
        assert!(RecordSanitizer::new(true).sanitize(&record, 2).is_ok());
    }
}
