//! Date normalization for heterogeneous source exports.
//!
//! Strategies, tried in order:
//! 1. exactly four digits -> year-only observation
//! 2. `%Y-%m-%d %H:%M:%S`, `%Y-%m-%d`, `%d/%m/%Y`, `%Y/%m/%d`
//! 3. text before the first space as `%Y-%m-%d`
//! 4. leading four digits -> year-only observation

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{IngestError, Result};
use crate::record::ObservedOn;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

pub fn parse_observed_on(raw: &str) -> Result<ObservedOn> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(IngestError::UnparseableDate(raw.to_string()));
    }

    if value.len() == 4 && is_ascii_digits(value) {
        return parse_year(value).ok_or_else(|| IngestError::UnparseableDate(raw.to_string()));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Ok(ObservedOn::Day(dt.date()));
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(ObservedOn::Day(date));
        }
    }

    // time part in some other shape, e.g. "2003-05-15 00:00"
    if let Some((date_part, _)) = value.split_once(' ') {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Ok(ObservedOn::Day(date));
        }
    }

    value
        .get(..4)
        .filter(|prefix| is_ascii_digits(prefix))
        .and_then(parse_year)
        .ok_or_else(|| IngestError::UnparseableDate(raw.to_string()))
}

fn parse_year(digits: &str) -> Option<ObservedOn> {
    digits.parse::<i32>().ok().map(ObservedOn::Year)
}

fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> ObservedOn {
        ObservedOn::Day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_bare_year() {
        assert_eq!(parse_observed_on("2003").unwrap(), ObservedOn::Year(2003));
        assert_eq!(parse_observed_on("  2019 ").unwrap(), ObservedOn::Year(2019));
    }

    #[test]
    fn test_datetime_format() {
        assert_eq!(parse_observed_on("2003-05-15 13:45:00").unwrap(), day(2003, 5, 15));
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(parse_observed_on("2004-12-01").unwrap(), day(2004, 12, 1));
    }

    #[test]
    fn test_brazilian_date() {
        assert_eq!(parse_observed_on("07/09/2010").unwrap(), day(2010, 9, 7));
    }

    #[test]
    fn test_slashed_iso_date() {
        assert_eq!(parse_observed_on("2015/02/28").unwrap(), day(2015, 2, 28));
    }

    #[test]
    fn test_date_before_space_with_partial_time() {
        assert_eq!(parse_observed_on("2003-05-15 00:00").unwrap(), day(2003, 5, 15));
    }

    #[test]
    fn test_leading_year_fallback() {
        assert_eq!(parse_observed_on("2003-13-45").unwrap(), ObservedOn::Year(2003));
        assert_eq!(parse_observed_on("2008T").unwrap(), ObservedOn::Year(2008));
    }

    #[test]
    fn test_unparseable() {
        for raw in ["", "   ", "n/a", "15-05", "20a3-01-01"] {
            let err = parse_observed_on(raw).unwrap_err();
            assert!(matches!(err, IngestError::UnparseableDate(_)), "{raw:?}");
        }
    }

    #[test]
    fn test_invalid_calendar_day_falls_back_to_year() {
        // February 30th does not exist; the leading year is still usable
        assert_eq!(parse_observed_on("2021-02-30").unwrap(), ObservedOn::Year(2021));
    }

    #[test]
    fn test_every_format_yields_the_right_year() {
        for raw in ["2012-03-04 05:06:07", "2012-03-04", "04/03/2012", "2012/03/04", "2012"] {
            assert_eq!(parse_observed_on(raw).unwrap().year(), 2012, "{raw}");
        }
    }
}
