//! Deterministic ordering helpers shared by the aggregations.

use serde::Serialize;
use std::cmp::Ordering;

/// A name with its occurrence count, as returned by rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub name: String,
    pub count: u64,
}

/// Stable sort with an explicit comparator.
pub fn sort_with<T, F>(items: &mut [T], compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    items.sort_by(compare);
}

/// Ascending order with duplicates removed.
pub fn distinct_ascending<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    sort_with(&mut items, T::cmp);
    items.dedup();
    items
}

/// Count descending, ties broken by name ascending.
pub fn rank_descending(counts: impl IntoIterator<Item = (String, u64)>) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = counts
        .into_iter()
        .map(|(name, count)| Ranked { name, count })
        .collect();
    sort_with(&mut ranked, |a, b| {
        b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name))
    });
    ranked
}
