//! Column schema of the story table.
//!
//! Headers are matched case-insensitively after trimming, and each column
//! accepts the alternative names used by older sheets.

use serde::{Deserialize, Serialize};

/// A recognized column of the story table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    EntityType,
    Id,
    Name,
    Effort,
    Team,
    Sprint,
    TeamSprint,
    SprintStart,
    SprintEnd,
    Status,
    StartDate,
    EndDate,
    SpillOver,
    SprintGoal,
    Comments,
}

impl Column {
    /// Every column, in the order a new table is laid out.
    pub const ALL: [Column; 15] = [
        Column::EntityType,
        Column::Id,
        Column::Name,
        Column::Effort,
        Column::Team,
        Column::Sprint,
        Column::TeamSprint,
        Column::SprintStart,
        Column::SprintEnd,
        Column::Status,
        Column::StartDate,
        Column::EndDate,
        Column::SpillOver,
        Column::SprintGoal,
        Column::Comments,
    ];

    /// Header written for this column.
    pub fn header(&self) -> &'static str {
        match self {
            Column::EntityType => "Entity Type",
            Column::Id => "ID",
            Column::Name => "Name",
            Column::Effort => "Effort",
            Column::Team => "Team",
            Column::Sprint => "Sprint",
            Column::TeamSprint => "Team Sprint",
            Column::SprintStart => "Sprint Start",
            Column::SprintEnd => "Sprint End",
            Column::Status => "Status",
            Column::StartDate => "Start Date",
            Column::EndDate => "End Date",
            Column::SpillOver => "SpillOver",
            Column::SprintGoal => "Sprint Goal",
            Column::Comments => "Comments",
        }
    }

    /// Resolve a header (or one of its aliases) to a column.
    pub fn from_header(header: &str) -> Option<Column> {
        let column = match header.trim().to_lowercase().as_str() {
            "entity type" => Column::EntityType,
            "id" => Column::Id,
            "name" | "user story" => Column::Name,
            "effort" | "efforts" => Column::Effort,
            "team" => Column::Team,
            "sprint" => Column::Sprint,
            "team sprint" => Column::TeamSprint,
            "sprint start" => Column::SprintStart,
            "sprint end" => Column::SprintEnd,
            "status" => Column::Status,
            "start date" => Column::StartDate,
            "end date" => Column::EndDate,
            "spillover" | "spill over" => Column::SpillOver,
            "sprint goal" => Column::SprintGoal,
            "comments" => Column::Comments,
            _ => return None,
        };
        Some(column)
    }

    /// Columns a saved table always carries, even when the source lacked them.
    pub fn is_required(&self) -> bool {
        !matches!(self, Column::TeamSprint)
    }
}

/// How items are grouped into sprints.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    /// Group by the Sprint column alone.
    Sprint,
    /// Group by team and sprint together.
    #[default]
    TeamSprint,
}

impl GroupBy {
    /// Build the group key for a row.
    ///
    /// In team-sprint mode an explicit "Team Sprint" value wins; otherwise
    /// team and sprint are joined with a space.
    pub fn key(&self, team: &str, sprint: &str, team_sprint: &str) -> String {
        match self {
            GroupBy::Sprint => sprint.to_string(),
            GroupBy::TeamSprint if !team_sprint.is_empty() => team_sprint.to_string(),
            GroupBy::TeamSprint => format!("{} {}", team, sprint).trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_header(column.header()), Some(column));
        }
    }

    #[test]
    fn test_header_aliases() {
        assert_eq!(Column::from_header("User Story"), Some(Column::Name));
        assert_eq!(Column::from_header(" efforts "), Some(Column::Effort));
        assert_eq!(Column::from_header("Spillover"), Some(Column::SpillOver));
        assert_eq!(Column::from_header("Id"), Some(Column::Id));
        assert_eq!(Column::from_header("Reviewer"), None);
    }

    #[test]
    fn test_group_key() {
        assert_eq!(GroupBy::Sprint.key("Core", "S1", ""), "S1");
        assert_eq!(GroupBy::TeamSprint.key("Core", "S1", ""), "Core S1");
        assert_eq!(GroupBy::TeamSprint.key("Core", "S1", "Core-S1"), "Core-S1");
        assert_eq!(GroupBy::TeamSprint.key("", "S1", ""), "S1");
    }
}
