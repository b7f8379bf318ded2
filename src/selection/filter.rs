//! Datetime filtering of partition aliases.

use chrono::NaiveDate;

use crate::naming::PartitionDates;
use crate::selection::DatetimeRange;

/// Aliases whose date coverage intersects `range`, ordered by start date.
///
/// A partition covers `[start, next_start)`, where `next_start` is the start
/// of the following partition of the same collection, so it is kept when
/// `start <= lte` and `next_start > gte`. The last partition is open-ended.
/// Aliases without a parseable start date are skipped.
pub fn filter_indexes_by_datetime(aliases: &[String], range: &DatetimeRange) -> Vec<String> {
    let mut partitions: Vec<(NaiveDate, &String)> = aliases
        .iter()
        .filter_map(|alias| match PartitionDates::parse(alias) {
            Some(dates) => Some((dates.start, alias)),
            None => {
                log::warn!("ignoring alias without a start date: {alias}");
                None
            }
        })
        .collect();
    partitions.sort();

    let mut selected = Vec::new();
    for (i, (start, alias)) in partitions.iter().enumerate() {
        let next_start = partitions.get(i + 1).map(|(next, _)| *next);
        let starts_in_range = range.lte.is_none_or(|lte| *start <= lte);
        let ends_in_range = match (range.gte, next_start) {
            (Some(gte), Some(next)) => next > gte,
            _ => true,
        };
        if starts_in_range && ends_in_range {
            selected.push((*alias).clone());
        }
    }
    selected
}
