//! Text timeline (Gantt-style) of scheduled items.

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::select;
use crate::models::{Item, Spillover};

/// One scheduled bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBar {
    pub label: String,
    pub group_key: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub spillover: Spillover,
}

/// Bars ordered by start date plus the items that could not be placed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Timeline {
    pub bars: Vec<TimelineBar>,
    pub unscheduled: Vec<String>,
}

impl Timeline {
    /// Earliest start and latest end across all bars.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.bars.iter().map(|b| b.start).min()?;
        let end = self.bars.iter().map(|b| b.end).max()?;
        Some((start, end))
    }
}

/// Place each selected item between its start and end date, falling back
/// to the sprint window for whichever end is missing.
pub fn build_timeline(items: &[Item], group_filter: Option<&str>) -> Timeline {
    let mut timeline = Timeline::default();

    for item in select(items, group_filter) {
        let start = item.start_date.or(item.group_start);
        let end = item.end_date.or(item.group_end);

        match (start, end) {
            (Some(start), Some(end)) if start <= end => timeline.bars.push(TimelineBar {
                label: item.label().to_string(),
                group_key: item.group_key.clone(),
                start,
                end,
                spillover: item.spillover(),
            }),
            _ => timeline.unscheduled.push(item.label().to_string()),
        }
    }

    timeline.bars.sort_by_key(|bar| (bar.start, bar.end));
    timeline
}

/// Render the timeline as fixed-width text. Spilled bars use `!`.
pub fn render_timeline(timeline: &Timeline, width: usize, date_format: &str) -> String {
    let mut output = String::new();

    let Some((first, last)) = timeline.span() else {
        output.push_str("No scheduled items.\n");
        push_unscheduled(&mut output, &timeline.unscheduled);
        return output;
    };

    let width = width.max(1);
    let days = (last - first).num_days() + 1;
    let label_width = timeline
        .bars
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0)
        .min(30);

    // Map a day offset to a column.
    let column = |date: NaiveDate| -> usize {
        let offset = (date - first).num_days();
        ((offset as f64 / days as f64) * width as f64).floor() as usize
    };

    output.push_str(&format!(
        "{:label_width$}  {} .. {}\n",
        "",
        first.format(date_format),
        last.format(date_format),
    ));

    for bar in &timeline.bars {
        let from = column(bar.start).min(width - 1);
        let to = (column(bar.end + chrono::Duration::days(1))).clamp(from + 1, width);
        let fill = if bar.spillover == Spillover::Yes { '!' } else { '#' };

        let mut line = String::with_capacity(width);
        line.extend(std::iter::repeat(' ').take(from));
        line.extend(std::iter::repeat(fill).take(to - from));
        line.extend(std::iter::repeat(' ').take(width - to));

        let label: String = bar.label.chars().take(label_width).collect();
        output.push_str(&format!(
            "{:label_width$}  |{}| {} -> {}\n",
            label,
            line,
            bar.start.format(date_format),
            bar.end.format(date_format),
        ));
    }

    push_unscheduled(&mut output, &timeline.unscheduled);
    output
}

fn push_unscheduled(output: &mut String, unscheduled: &[String]) {
    if unscheduled.is_empty() {
        return;
    }
    output.push_str(&format!("\nUnscheduled: {}\n", unscheduled.join(", ")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn create_test_item(
        name: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Item {
        Item {
            entity_type: String::new(),
            id: String::new(),
            name: name.to_string(),
            effort: 1.0,
            team: String::new(),
            sprint: "S1".to_string(),
            team_sprint: String::new(),
            group_key: "S1".to_string(),
            status: Status::InProgress,
            start_date: start,
            end_date: end,
            group_start: date(2024, 1, 1),
            group_end: date(2024, 1, 10),
            sprint_goal: String::new(),
            comments: String::new(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_build_timeline_orders_and_falls_back() {
        let items = vec![
            create_test_item("Late", date(2024, 1, 5), date(2024, 1, 12)),
            create_test_item("Open", date(2024, 1, 3), None),
            create_test_item("Backwards", date(2024, 1, 9), date(2024, 1, 2)),
        ];

        let timeline = build_timeline(&items, None);

        assert_eq!(timeline.bars.len(), 2);
        assert_eq!(timeline.bars[0].label, "Open");
        assert_eq!(timeline.bars[0].end, date(2024, 1, 10).unwrap());
        assert_eq!(timeline.bars[1].spillover, Spillover::Yes);
        assert_eq!(timeline.unscheduled, vec!["Backwards".to_string()]);
        assert_eq!(
            timeline.span(),
            Some((date(2024, 1, 3).unwrap(), date(2024, 1, 12).unwrap()))
        );
    }

    #[test]
    fn test_build_timeline_filters_group() {
        let items = vec![create_test_item("A", date(2024, 1, 2), date(2024, 1, 4))];
        assert!(build_timeline(&items, Some("S2")).bars.is_empty());
    }

    #[test]
    fn test_render_timeline() {
        let items = vec![
            create_test_item("A", date(2024, 1, 1), date(2024, 1, 5)),
            create_test_item("B", date(2024, 1, 6), date(2024, 1, 12)),
        ];
        let rendered = render_timeline(&build_timeline(&items, None), 12, "%d-%m-%Y");
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("01-01-2024 .. 12-01-2024"));
        assert!(lines[1].starts_with("A  |#####       |"));
        assert!(lines[2].starts_with("B  |     !!!!!!!|"));
    }

    #[test]
    fn test_render_empty_timeline() {
        let items = vec![Item {
            group_start: None,
            group_end: None,
            ..create_test_item("Floating", None, None)
        }];
        let rendered = render_timeline(&build_timeline(&items, None), 20, "%d-%m-%Y");

        assert!(rendered.contains("No scheduled items."));
        assert!(rendered.contains("Unscheduled: Floating"));
    }
}
