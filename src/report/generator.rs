//! Markdown and JSON report generation.
//!
//! This module renders on-time-delivery reports and item tables from
//! classified items and their statistics.

use crate::analysis::{aggregate, aggregate_by_group, delayed_items, select_rows, status_breakdown};
use crate::models::{Item, Stats};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A complete on-time-delivery report.
#[derive(Debug, Clone, Serialize)]
pub struct OtdReport {
    /// Table file the report was built from.
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Statistics over every item.
    pub overall: Stats,
    /// The sprint the report focuses on, if one was selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    /// Per-sprint statistics (only the selected sprint when one is set).
    pub sprints: Vec<Stats>,
    /// Items that spilled over within the selection.
    pub delayed: Vec<Item>,
    /// Rows of the selection, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<TableRow>,
}

/// An item together with its row index in the table file.
#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub row: usize,
    #[serde(flatten)]
    pub item: Item,
}

impl OtdReport {
    /// Build a report over the given items.
    pub fn build(
        source: impl Into<String>,
        items: &[Item],
        selected: Option<&str>,
        include_items: bool,
    ) -> Self {
        let sprints = match selected {
            Some(group) => vec![aggregate(items, Some(group))],
            None => aggregate_by_group(items),
        };

        Self {
            source: source.into(),
            generated_at: Utc::now(),
            overall: aggregate(items, None),
            selected: selected.map(str::to_string),
            sprints,
            delayed: delayed_items(items, selected).into_iter().cloned().collect(),
            items: if include_items {
                select_rows(items, selected)
                    .map(|(row, item)| TableRow {
                        row,
                        item: item.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        }
    }

    /// The figure that decides pass/fail for `--fail-below`.
    pub fn headline_otd(&self) -> f64 {
        match self.selected {
            Some(_) => self
                .sprints
                .first()
                .map(|s| s.otd_percentage)
                .unwrap_or(0.0),
            None => self.overall.otd_percentage,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &OtdReport, date_format: &str) -> String {
    let mut output = String::new();

    output.push_str("# On-Time Delivery Report\n\n");
    output.push_str(&format!(
        "*Source: {} | Generated: {}*\n\n",
        report.source,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str(&generate_overall_section(&report.overall));
    output.push_str(&generate_sprint_table(&report.sprints));

    if let Some(stats) = report.selected.as_ref().and(report.sprints.first()) {
        output.push_str(&generate_sprint_details(stats));
    }

    output.push_str(&generate_delayed_section(&report.delayed, date_format));

    if !report.items.is_empty() {
        output.push_str("## Items\n\n");
        let rows = report.items.iter().map(|r| (r.row, &r.item));
        output.push_str(&generate_items_table(rows, date_format));
        output.push('\n');
    }

    output
}

/// Generate the headline section.
fn generate_overall_section(overall: &Stats) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "### Average OTD % till now: {:.2}%\n\n",
        overall.otd_percentage
    ));
    section.push_str(&format!(
        "- **On-time %:** {:.2}%\n",
        overall.on_time_percentage
    ));
    section.push_str(&format!("- **Total Tasks:** {}\n", overall.total_tasks));
    section.push_str(&format!("- **Done Tasks:** {}\n", overall.done_tasks));
    section.push_str(&format!("- **Delayed Tasks:** {}\n\n", overall.delayed_tasks));

    section
}

/// Generate the per-sprint summary table.
fn generate_sprint_table(sprints: &[Stats]) -> String {
    let mut section = String::new();

    section.push_str("## Sprints\n\n");

    if sprints.is_empty() {
        section.push_str("No sprints found.\n\n");
        return section;
    }

    section.push_str("| Sprint | Effort | Stories | Tasks | Done | On Time | Delayed | OTD % |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for stats in sprints {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {:.2}% |\n",
            escape_cell(stats.group_label()),
            stats.total_effort,
            stats.distinct_story_count,
            stats.total_tasks,
            stats.done_tasks,
            stats.on_time_tasks,
            stats.delayed_tasks,
            stats.otd_percentage
        ));
    }
    section.push('\n');

    section
}

/// Generate the detail block for the selected sprint.
fn generate_sprint_details(stats: &Stats) -> String {
    let mut section = String::new();

    section.push_str(&format!("### Sprint: {}\n\n", stats.group_label()));
    section.push_str(&format!("**Total Efforts**: {}\n\n", stats.total_effort));
    section.push_str(&format!(
        "**Total User Stories**: {}\n\n",
        stats.distinct_story_count
    ));
    section.push_str(&format!("**Total Tasks**: {}\n\n", stats.total_tasks));
    section.push_str(&format!("**Done Tasks**: {}\n\n", stats.done_tasks));
    section.push_str(&format!("**On-Time Tasks**: {}\n\n", stats.on_time_tasks));
    section.push_str(&format!("**Delayed Tasks**: {}\n\n", stats.delayed_tasks));
    section.push_str(&format!("**OTD %**: {:.2}%\n\n", stats.otd_percentage));

    section
}

/// Generate the list of spilled-over items.
fn generate_delayed_section(delayed: &[Item], date_format: &str) -> String {
    let mut section = String::new();

    section.push_str("## Delayed Items\n\n");

    if delayed.is_empty() {
        section.push_str("Nothing spilled over.\n\n");
        return section;
    }

    let fmt_date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format(date_format).to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    for item in delayed {
        section.push_str(&format!(
            "- **{}** ({}): finished {}, sprint ended {}\n",
            item.label(),
            item.group_key,
            fmt_date(item.end_date),
            fmt_date(item.group_end)
        ));
    }
    section.push('\n');

    section
}

/// Render `(row, item)` pairs as a Markdown table. The row number is the
/// table index used by `edit` and `delete`.
pub fn generate_items_table<'a>(
    rows: impl IntoIterator<Item = (usize, &'a Item)>,
    date_format: &str,
) -> String {
    let mut table = String::new();

    table.push_str("| # | ID | Name | Effort | Sprint | Status | Start | End | Sprint End | Spillover |\n");
    table.push_str("|---:|:---|:---|:---:|:---|:---|:---|:---|:---|:---:|\n");

    let fmt_date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format(date_format).to_string())
            .unwrap_or_default()
    };

    for (row, item) in rows {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            row,
            escape_cell(&item.id),
            escape_cell(&item.name),
            item.effort,
            escape_cell(&item.group_key),
            escape_cell(&item.status.to_string()),
            fmt_date(item.start_date),
            fmt_date(item.end_date),
            fmt_date(item.group_end),
            item.spillover()
        ));
    }

    table
}

/// Escape a value for a Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Summarize status counts for a selection as a single line.
pub fn generate_status_line(items: &[Item], group_filter: Option<&str>) -> String {
    let counts = status_breakdown(items, group_filter);
    if counts.is_empty() {
        return "No items.".to_string();
    }

    counts
        .iter()
        .map(|(status, count)| format!("{}: {}", status, count))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &OtdReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
