//! Occurrence record model
//!
//! Column layout of every source and canonical CSV (header required):
//!   0 = source id, 1 = focus id, 2 = latitude, 3 = longitude, 4 = date,
//!   5 = country, 6 = state, 7 = municipality, 8 = biome

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Minimum number of columns a data row must carry.
pub const MIN_COLUMNS: usize = 9;

pub const COL_SOURCE_ID: usize = 0;
pub const COL_FOCUS_ID: usize = 1;
pub const COL_LATITUDE: usize = 2;
pub const COL_LONGITUDE: usize = 3;
pub const COL_DATE: usize = 4;
pub const COL_COUNTRY: usize = 5;
pub const COL_STATE: usize = 6;
pub const COL_MUNICIPALITY: usize = 7;
pub const COL_BIOME: usize = 8;

/// When an occurrence was observed.
///
/// Sources that only carry the year produce `Year`; those records take part in
/// yearly aggregations but have no month or season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedOn {
    Day(NaiveDate),
    Year(i32),
}

impl ObservedOn {
    pub fn year(&self) -> i32 {
        match self {
            ObservedOn::Day(d) => d.year(),
            ObservedOn::Year(y) => *y,
        }
    }

    /// Month in 1..=12, or None for year-only observations.
    pub fn month(&self) -> Option<u32> {
        match self {
            ObservedOn::Day(d) => Some(d.month()),
            ObservedOn::Year(_) => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            ObservedOn::Day(d) => Some(*d),
            ObservedOn::Year(_) => None,
        }
    }
}

/// One observed fire/deforestation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub source_id: String,
    pub focus_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
    pub state: Option<String>,
    pub municipality: Option<String>,
    pub biome: Option<String>,
    pub observed_on: ObservedOn,
}

impl Occurrence {
    pub fn year(&self) -> i32 {
        self.observed_on.year()
    }

    pub fn month(&self) -> Option<u32> {
        self.observed_on.month()
    }
}

/// Turn a trimmed cell into an optional value (blank -> None).
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_observation_exposes_month() {
        let on = ObservedOn::Day(NaiveDate::from_ymd_opt(2019, 8, 21).unwrap());
        assert_eq!(on.year(), 2019);
        assert_eq!(on.month(), Some(8));
    }

    #[test]
    fn test_year_observation_has_no_month() {
        let on = ObservedOn::Year(2003);
        assert_eq!(on.year(), 2003);
        assert_eq!(on.month(), None);
        assert_eq!(on.date(), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  Amazonia "), Some("Amazonia".to_string()));
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank(""), None);
    }
}
