//! Data models for the story tracker.
//!
//! This module contains the core data structures used throughout
//! the application for representing raw rows, classified items and
//! delivery statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::schema::Column;

/// Workflow status of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    InProgress,
    Done,
    /// Any other label found in the table, kept verbatim.
    Other(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotStarted => write!(f, "Not Started"),
            Status::InProgress => write!(f, "In Progress"),
            Status::Done => write!(f, "Done"),
            Status::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "not started" | "not-started" | "notstarted" => Status::NotStarted,
            "in progress" | "in-progress" | "inprogress" => Status::InProgress,
            "done" => Status::Done,
            _ => Status::Other(trimmed.to_string()),
        }
    }
}

impl Status {
    /// Returns true for the Done status only.
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Done)
    }
}

/// Whether an item finished after its sprint window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spillover {
    Yes,
    No,
}

impl fmt::Display for Spillover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spillover::Yes => write!(f, "Yes"),
            Spillover::No => write!(f, "No"),
        }
    }
}

impl Spillover {
    /// Derive spillover from an item's completion date and its sprint end.
    ///
    /// Only a completion date strictly after the sprint end spills over.
    /// A missing date on either side yields `No`.
    pub fn between(end_date: Option<NaiveDate>, group_end: Option<NaiveDate>) -> Self {
        match (end_date, group_end) {
            (Some(end), Some(sprint_end)) if end > sprint_end => Spillover::Yes,
            _ => Spillover::No,
        }
    }
}

/// A single untyped cell value as supplied by the table file or the CLI.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            RawValue::Empty
        } else {
            RawValue::Text(s.to_string())
        }
    }
}

/// One unclassified row: column header to raw value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[allow(dead_code)] // Used when assembling records by hand
    pub fn with(mut self, header: impl Into<String>, value: RawValue) -> Self {
        self.insert(header, value);
        self
    }

    /// Set a value, replacing any value stored under a header that
    /// resolves to the same column.
    pub fn insert(&mut self, header: impl Into<String>, value: RawValue) {
        let header = header.into();
        if let Some(column) = Column::from_header(&header) {
            self.fields
                .retain(|existing, _| Column::from_header(existing) != Some(column));
        }
        self.fields.insert(header, value);
    }

    /// Look up a recognized column through any of its header aliases.
    pub fn get(&self, column: Column) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(header, _)| Column::from_header(header) == Some(column))
            .map(|(_, value)| value)
    }

    /// Values stored under headers that are not part of the schema.
    pub fn extras(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.fields
            .iter()
            .filter(|(header, _)| Column::from_header(header).is_none())
    }

    /// Copy every value of `other` over this record.
    pub fn overlay(&mut self, other: &RawRecord) {
        for (header, value) in &other.fields {
            self.insert(header.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A classified work item (user story or task).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "ItemSnapshot")]
pub struct Item {
    pub entity_type: String,
    pub id: String,
    pub name: String,
    pub effort: f64,
    pub team: String,
    pub sprint: String,
    /// Explicit "Team Sprint" value from the table, if any.
    pub team_sprint: String,
    /// Key used for grouping (sprint or team + sprint).
    pub group_key: String,
    pub status: Status,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub group_start: Option<NaiveDate>,
    pub group_end: Option<NaiveDate>,
    pub sprint_goal: String,
    pub comments: String,
    /// Columns outside the schema, carried through unchanged.
    pub extra: BTreeMap<String, String>,
}

impl Item {
    /// Spillover is never stored; it always reflects the current dates.
    pub fn spillover(&self) -> Spillover {
        Spillover::between(self.end_date, self.group_end)
    }

    /// Human-facing label: the name, or the ID when the name is blank.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Key used to count distinct stories; `None` when the row has neither
    /// a name nor an ID.
    pub fn story_key(&self) -> Option<&str> {
        let label = self.label();
        if label.is_empty() {
            None
        } else {
            Some(label)
        }
    }

    /// Render one column as it is written to the table file.
    pub fn column_text(&self, column: Column, date_format: &str) -> String {
        let date = |d: Option<NaiveDate>| {
            d.map(|d| d.format(date_format).to_string())
                .unwrap_or_default()
        };

        match column {
            Column::EntityType => self.entity_type.clone(),
            Column::Id => self.id.clone(),
            Column::Name => self.name.clone(),
            Column::Effort => self.effort.to_string(),
            Column::Team => self.team.clone(),
            Column::Sprint => self.sprint.clone(),
            Column::TeamSprint => self.team_sprint.clone(),
            Column::SprintStart => date(self.group_start),
            Column::SprintEnd => date(self.group_end),
            Column::Status => self.status.to_string(),
            Column::StartDate => date(self.start_date),
            Column::EndDate => date(self.end_date),
            Column::SpillOver => self.spillover().to_string(),
            Column::SprintGoal => self.sprint_goal.clone(),
            Column::Comments => self.comments.clone(),
        }
    }

    /// Serialize back into a raw record, the same way the table file stores it.
    pub fn to_record(&self, date_format: &str) -> RawRecord {
        let mut record = RawRecord::new();
        for column in Column::ALL {
            let text = self.column_text(column, date_format);
            record.insert(column.header(), RawValue::from(text.as_str()));
        }
        for (header, value) in &self.extra {
            record.insert(header.clone(), RawValue::from(value.as_str()));
        }
        record
    }
}

/// Flat serializable view of an [`Item`] including its derived spillover.
#[derive(Debug, Clone, Serialize)]
pub struct ItemSnapshot {
    pub entity_type: String,
    pub id: String,
    pub name: String,
    pub effort: f64,
    pub team: String,
    pub sprint: String,
    pub group_key: String,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sprint_start: Option<NaiveDate>,
    pub sprint_end: Option<NaiveDate>,
    pub spillover: Spillover,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sprint_goal: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comments: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl From<Item> for ItemSnapshot {
    fn from(item: Item) -> Self {
        let spillover = item.spillover();
        Self {
            entity_type: item.entity_type,
            id: item.id,
            name: item.name,
            effort: item.effort,
            team: item.team,
            sprint: item.sprint,
            group_key: item.group_key,
            status: item.status.to_string(),
            start_date: item.start_date,
            end_date: item.end_date,
            sprint_start: item.group_start,
            sprint_end: item.group_end,
            spillover,
            sprint_goal: item.sprint_goal,
            comments: item.comments,
            extra: item.extra,
        }
    }
}

/// Delivery statistics for one group of items (or all of them).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    /// The group filter these stats were computed for; `None` means overall.
    pub group: Option<String>,
    /// Sum of effort over the selected items.
    pub total_effort: f64,
    /// Number of distinct stories (by name, falling back to ID).
    pub distinct_story_count: usize,
    /// Number of selected items.
    pub total_tasks: usize,
    /// Items with status Done.
    pub done_tasks: usize,
    /// Done items that did not spill over.
    pub on_time_tasks: usize,
    /// Items that spilled over, whatever their status.
    pub delayed_tasks: usize,
    /// Done items as a share of all items, in percent.
    pub otd_percentage: f64,
    /// On-time items as a share of all items, in percent.
    pub on_time_percentage: f64,
}

impl Stats {
    /// Display name for the group.
    pub fn group_label(&self) -> &str {
        self.group.as_deref().unwrap_or("All sprints")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(Status::from("Done"), Status::Done);
        assert_eq!(Status::from("  done "), Status::Done);
        assert_eq!(Status::from("In Progress"), Status::InProgress);
        assert_eq!(Status::from("not started"), Status::NotStarted);
        assert_eq!(
            Status::from(" Blocked "),
            Status::Other("Blocked".to_string())
        );
    }

    #[test]
    fn test_status_display_round_trip() {
        for status in [Status::NotStarted, Status::InProgress, Status::Done] {
            assert_eq!(Status::from(status.to_string().as_str()), status);
        }
    }

    #[test]
    fn test_spillover_between() {
        assert_eq!(
            Spillover::between(date(2024, 1, 10), date(2024, 1, 5)),
            Spillover::Yes
        );
        assert_eq!(
            Spillover::between(date(2024, 1, 5), date(2024, 1, 5)),
            Spillover::No
        );
        assert_eq!(
            Spillover::between(date(2024, 1, 1), date(2024, 1, 5)),
            Spillover::No
        );
        assert_eq!(Spillover::between(None, date(2024, 1, 5)), Spillover::No);
        assert_eq!(Spillover::between(date(2024, 1, 10), None), Spillover::No);
    }

    #[test]
    fn test_raw_record_alias_lookup() {
        let record = RawRecord::new()
            .with("User Story", RawValue::from("Login page"))
            .with("Efforts", RawValue::Number(3.0))
            .with("Reviewer", RawValue::from("sam"));

        assert_eq!(
            record.get(Column::Name),
            Some(&RawValue::Text("Login page".to_string()))
        );
        assert_eq!(record.get(Column::Effort), Some(&RawValue::Number(3.0)));
        assert_eq!(record.get(Column::Comments), None);
        assert_eq!(record.extras().count(), 1);
    }

    #[test]
    fn test_raw_record_insert_replaces_alias() {
        let mut record = RawRecord::new().with("User Story", RawValue::from("Old"));
        record.insert("Name", RawValue::from("New"));

        assert_eq!(
            record.get(Column::Name),
            Some(&RawValue::Text("New".to_string()))
        );
        assert_eq!(record.fields.len(), 1);
    }

    #[test]
    fn test_raw_value_blank_text_is_empty() {
        assert_eq!(RawValue::from("   "), RawValue::Empty);
        assert_eq!(RawValue::from("x"), RawValue::Text("x".to_string()));
    }

    #[test]
    fn test_item_snapshot_carries_spillover() {
        let item = Item {
            entity_type: "Task".to_string(),
            id: "T-1".to_string(),
            name: String::new(),
            effort: 2.0,
            team: "Core".to_string(),
            sprint: "S1".to_string(),
            team_sprint: String::new(),
            group_key: "Core S1".to_string(),
            status: Status::Done,
            start_date: date(2024, 1, 2),
            end_date: date(2024, 1, 10),
            group_start: date(2024, 1, 1),
            group_end: date(2024, 1, 5),
            sprint_goal: String::new(),
            comments: String::new(),
            extra: BTreeMap::new(),
        };

        assert_eq!(item.label(), "T-1");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["spillover"], "Yes");
        assert_eq!(json["status"], "Done");
        assert!(json.get("comments").is_none());
    }
}
