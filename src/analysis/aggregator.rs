//! Delivery aggregation and statistics.
//!
//! This module rolls classified items up into per-sprint and overall
//! on-time-delivery figures.

use crate::models::{Item, Spillover, Stats};
use std::collections::{BTreeMap, HashSet};

/// Items belonging to a group, or all items when no filter is given.
/// The match is exact and case-sensitive.
pub fn select<'a>(
    items: &'a [Item],
    group_filter: Option<&'a str>,
) -> impl Iterator<Item = &'a Item> + 'a {
    items
        .iter()
        .filter(move |item| group_filter.map_or(true, |group| item.group_key == group))
}

/// Like [`select`], but paired with each item's index in the whole table.
/// That index is the row number `edit` and `delete` take.
pub fn select_rows<'a>(
    items: &'a [Item],
    group_filter: Option<&'a str>,
) -> impl Iterator<Item = (usize, &'a Item)> + 'a {
    items
        .iter()
        .enumerate()
        .filter(move |(_, item)| group_filter.map_or(true, |group| item.group_key == group))
}

/// Compute delivery statistics for one group (or overall).
///
/// Every figure is defined for an empty selection; percentages are 0
/// when there are no tasks.
pub fn aggregate(items: &[Item], group_filter: Option<&str>) -> Stats {
    let mut stats = Stats {
        group: group_filter.map(str::to_string),
        ..Stats::default()
    };
    let mut stories: HashSet<&str> = HashSet::new();

    for item in select(items, group_filter) {
        stats.total_tasks += 1;
        stats.total_effort += item.effort;

        if let Some(key) = item.story_key() {
            stories.insert(key);
        }

        let spilled = item.spillover() == Spillover::Yes;
        if item.status.is_done() {
            stats.done_tasks += 1;
            if !spilled {
                stats.on_time_tasks += 1;
            }
        }
        if spilled {
            stats.delayed_tasks += 1;
        }
    }

    stats.distinct_story_count = stories.len();
    stats.otd_percentage = percentage(stats.done_tasks, stats.total_tasks);
    stats.on_time_percentage = percentage(stats.on_time_tasks, stats.total_tasks);

    stats
}

/// Distinct group keys in the order they first appear.
pub fn group_keys(items: &[Item]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.group_key.as_str()))
        .map(|item| item.group_key.clone())
        .collect()
}

/// Statistics for every group, in first-seen order.
pub fn aggregate_by_group(items: &[Item]) -> Vec<Stats> {
    group_keys(items)
        .iter()
        .map(|key| aggregate(items, Some(key.as_str())))
        .collect()
}

/// Items that spilled over, whatever their status.
pub fn delayed_items<'a>(items: &'a [Item], group_filter: Option<&'a str>) -> Vec<&'a Item> {
    select(items, group_filter)
        .filter(|item| item.spillover() == Spillover::Yes)
        .collect()
}

/// Count items per status label.
pub fn status_breakdown(items: &[Item], group_filter: Option<&str>) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for item in select(items, group_filter) {
        let label = item.status.to_string();
        let label = if label.is_empty() {
            "(none)".to_string()
        } else {
            label
        };
        *counts.entry(label).or_default() += 1;
    }

    counts
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}
