//! Grouped counts over a snapshot of occurrence records.
//!
//! Every function is pure: it scans the slice it is given and keeps no state.

use ingest::Occurrence;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::order::{distinct_ascending, rank_descending, Ranked};

/// Southern-hemisphere seasons, declared in the order a scan visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}

impl Season {
    pub fn from_month(month: u32) -> Option<Season> {
        match month {
            12 | 1 | 2 => Some(Season::Summer),
            3..=5 => Some(Season::Autumn),
            6..=8 => Some(Season::Winter),
            9..=11 => Some(Season::Spring),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
            Season::Spring => "Spring",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn years_ascending(records: &[Occurrence]) -> Vec<i32> {
    distinct_ascending(records.iter().map(Occurrence::year).collect())
}

pub fn count_by_year(records: &[Occurrence]) -> BTreeMap<i32, u64> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.year()).or_insert(0) += 1;
    }
    counts
}

pub fn biomes_alphabetical(records: &[Occurrence]) -> Vec<String> {
    distinct_ascending(records.iter().filter_map(|r| r.biome.clone()).collect())
}

pub fn count_by_biome(records: &[Occurrence]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for biome in records.iter().filter_map(|r| r.biome.as_ref()) {
        *counts.entry(biome.clone()).or_insert(0) += 1;
    }
    counts
}

/// Year-only records have no month and are left out.
pub fn count_by_month(records: &[Occurrence]) -> BTreeMap<u32, u64> {
    let mut counts = BTreeMap::new();
    for month in records.iter().filter_map(Occurrence::month) {
        *counts.entry(month).or_insert(0) += 1;
    }
    counts
}

pub fn count_by_season(records: &[Occurrence]) -> BTreeMap<Season, u64> {
    let mut counts = BTreeMap::new();
    for season in records
        .iter()
        .filter_map(Occurrence::month)
        .filter_map(Season::from_month)
    {
        *counts.entry(season).or_insert(0) += 1;
    }
    counts
}

/// The season with the highest count; on a tie the first one scanned wins.
pub fn season_with_most_occurrences(records: &[Occurrence]) -> Option<(Season, u64)> {
    let mut best: Option<(Season, u64)> = None;
    for (season, count) in count_by_season(records) {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((season, count)),
        }
    }
    best
}

/// Percent change between consecutive years present, rounded to 2 decimals.
/// The first year is never a key; a previous count of 0 yields 0.
pub fn growth_percent_by_year(records: &[Occurrence]) -> BTreeMap<i32, f64> {
    growth_from_counts(&count_by_year(records))
}

pub fn growth_from_counts(counts: &BTreeMap<i32, u64>) -> BTreeMap<i32, f64> {
    counts
        .iter()
        .zip(counts.iter().skip(1))
        .map(|((_, &previous), (&year, &current))| {
            (year, round2(percent_change(previous, current)))
        })
        .collect()
}

/// Percent change from the first year's count to the last year's count.
pub fn overall_change_percent(records: &[Occurrence]) -> f64 {
    let counts = count_by_year(records);
    match (counts.values().next(), counts.values().next_back()) {
        (Some(&first), Some(&last)) if counts.len() >= 2 => round2(percent_change(first, last)),
        _ => 0.0,
    }
}

pub fn top_municipalities(records: &[Occurrence], limit: usize) -> Vec<Ranked> {
    top_by(records, limit, |r| r.municipality.as_deref())
}

pub fn top_states(records: &[Occurrence], limit: usize) -> Vec<Ranked> {
    top_by(records, limit, |r| r.state.as_deref())
}

fn top_by<'a, F>(records: &'a [Occurrence], limit: usize, key: F) -> Vec<Ranked>
where
    F: Fn(&'a Occurrence) -> Option<&'a str>,
{
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for name in records.iter().filter_map(key) {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut ranked = rank_descending(counts.into_iter().map(|(name, count)| (name.to_string(), count)));
    ranked.truncate(limit);
    ranked
}

fn percent_change(previous: u64, current: u64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    (current as f64 - previous as f64) / previous as f64 * 100.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
