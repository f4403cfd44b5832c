//! Record normalization and spillover classification.
//!
//! Turns raw table rows into typed [`Item`]s: strings are trimmed, effort
//! and dates are coerced, and a value that cannot be coerced becomes
//! absent rather than an error.

use chrono::NaiveDate;

use crate::models::{Item, RawRecord, RawValue, Status};
use crate::schema::{Column, GroupBy};

/// Date representation used by the table file unless configured otherwise.
pub const DEFAULT_DATE_FORMAT: &str = "%d-%m-%Y";

/// Classifies raw records using one accepted date format and a grouping mode.
#[derive(Debug, Clone)]
pub struct Classifier {
    date_format: String,
    group_by: GroupBy,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            group_by: GroupBy::default(),
        }
    }
}

impl Classifier {
    pub fn new(date_format: impl Into<String>, group_by: GroupBy) -> Self {
        Self {
            date_format: date_format.into(),
            group_by,
        }
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    #[allow(dead_code)] // Accessor kept symmetric with date_format
    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    /// Classify every row. Pure: the output depends only on the input rows.
    pub fn classify(&self, rows: &[RawRecord]) -> Vec<Item> {
        rows.iter().map(|row| self.classify_row(row)).collect()
    }

    /// Classify a single row.
    pub fn classify_row(&self, row: &RawRecord) -> Item {
        let team = self.text(row, Column::Team);
        let sprint = self.text(row, Column::Sprint);
        let team_sprint = self.text(row, Column::TeamSprint);
        let group_key = self.group_by.key(&team, &sprint, &team_sprint);

        // A stored SpillOver value is ignored; Item derives it from the dates.
        Item {
            entity_type: self.text(row, Column::EntityType),
            id: self.text(row, Column::Id),
            name: self.text(row, Column::Name),
            effort: effort(row.get(Column::Effort)),
            team,
            sprint,
            team_sprint,
            group_key,
            status: Status::from(self.text(row, Column::Status).as_str()),
            start_date: self.date(row.get(Column::StartDate)),
            end_date: self.date(row.get(Column::EndDate)),
            group_start: self.date(row.get(Column::SprintStart)),
            group_end: self.date(row.get(Column::SprintEnd)),
            sprint_goal: self.text(row, Column::SprintGoal),
            comments: self.text(row, Column::Comments),
            extra: row
                .extras()
                .map(|(header, value)| (header.clone(), self.value_text(value)))
                .collect(),
        }
    }

    /// Trimmed text for a column; missing columns become empty.
    fn text(&self, row: &RawRecord, column: Column) -> String {
        row.get(column)
            .map(|value| self.value_text(value))
            .unwrap_or_default()
    }

    fn value_text(&self, value: &RawValue) -> String {
        match value {
            RawValue::Empty => String::new(),
            RawValue::Text(s) => s.trim().to_string(),
            RawValue::Number(n) => n.to_string(),
            RawValue::Date(d) => d.format(&self.date_format).to_string(),
        }
    }

    fn date(&self, value: Option<&RawValue>) -> Option<NaiveDate> {
        match value? {
            RawValue::Date(d) => Some(*d),
            RawValue::Text(s) => parse_date(s, &self.date_format),
            RawValue::Empty | RawValue::Number(_) => None,
        }
    }
}

/// Classify rows with the default date format and grouping.
#[allow(dead_code)] // Convenience entry point; the CLI uses a configured Classifier
pub fn classify(rows: &[RawRecord]) -> Vec<Item> {
    Classifier::default().classify(rows)
}

/// Parse a calendar date in exactly one format; anything else is absent.
pub fn parse_date(text: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), format).ok()
}

/// Coerce an effort value. Negative, non-finite or non-numeric input is 0.
fn effort(value: Option<&RawValue>) -> f64 {
    let n = match value {
        Some(RawValue::Number(n)) => *n,
        Some(RawValue::Text(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}
