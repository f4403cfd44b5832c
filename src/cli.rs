//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::{RawRecord, RawValue, Status};
use crate::schema::{Column, GroupBy};

/// StoryTracker - sprint story tracker with on-time-delivery reporting
///
/// Keeps user stories and tasks in a CSV table, derives spillover from
/// completion and sprint end dates, and reports OTD per sprint.
///
/// Examples:
///   storytracker list --sprint "Core S1"
///   storytracker otd --format json --output otd.json
///   storytracker add --name Login --team Core --sprint S1 --status done --end-date 2024-01-10
///   storytracker edit --row 3 --status done --end-date 2024-01-12
///   storytracker timeline --sprint "Core S1"
///   storytracker init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Story table (CSV) to read and write
    ///
    /// Defaults to the data_file setting, "Story Tracker.csv" unless configured.
    #[arg(short, long, value_name = "FILE", env = "STORYTRACKER_FILE", global = true)]
    pub file: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .storytracker.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// How items are grouped into sprints
    #[arg(long, value_name = "MODE", global = true)]
    pub group_by: Option<GroupBy>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the classified table
    List {
        /// Only show rows of this sprint
        #[arg(long, value_name = "KEY")]
        sprint: Option<String>,
    },

    /// List sprint keys in table order
    Sprints,

    /// On-time-delivery statistics
    Otd(OtdArgs),

    /// Text timeline of scheduled items
    Timeline {
        /// Only show rows of this sprint
        #[arg(long, value_name = "KEY")]
        sprint: Option<String>,

        /// Bar width in characters
        #[arg(long, value_name = "CHARS")]
        width: Option<usize>,
    },

    /// Append a new item
    Add(ItemFields),

    /// Change fields of an existing item
    Edit {
        /// Row number as shown by `list`
        #[arg(long, value_name = "N")]
        row: usize,

        #[command(flatten)]
        fields: ItemFields,
    },

    /// Remove an item
    Delete {
        /// Row number as shown by `list`
        #[arg(long, value_name = "N")]
        row: usize,
    },

    /// Export the classified table to an .xlsx workbook
    Export {
        /// Workbook to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Generate a default .storytracker.toml configuration file
    InitConfig,
}

/// Options of the `otd` subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct OtdArgs {
    /// Report on a single sprint
    #[arg(long, value_name = "KEY")]
    pub sprint: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// List the selected rows under the statistics
    #[arg(long)]
    pub items: bool,

    /// Fail if the OTD % is below this value
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is not met.
    #[arg(long, value_name = "PCT")]
    pub fail_below: Option<f64>,
}

/// Item fields accepted by `add` and `edit`. Dates are YYYY-MM-DD.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ItemFields {
    /// Entity type (e.g. "User Story", "Task")
    #[arg(long, value_name = "TYPE")]
    pub entity_type: Option<String>,

    /// Item ID
    #[arg(long = "id", value_name = "ID")]
    pub item_id: Option<String>,

    /// Item name
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Effort (non-negative)
    #[arg(long, value_name = "POINTS")]
    pub effort: Option<f64>,

    #[arg(long, value_name = "TEAM")]
    pub team: Option<String>,

    #[arg(long, value_name = "SPRINT")]
    pub sprint: Option<String>,

    /// Explicit team-sprint key
    #[arg(long, value_name = "KEY")]
    pub team_sprint: Option<String>,

    #[arg(long, value_name = "DATE")]
    pub sprint_start: Option<NaiveDate>,

    #[arg(long, value_name = "DATE")]
    pub sprint_end: Option<NaiveDate>,

    #[arg(long, value_name = "STATUS")]
    pub status: Option<StatusArg>,

    #[arg(long, value_name = "DATE")]
    pub start_date: Option<NaiveDate>,

    /// Completion date
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    #[arg(long, value_name = "TEXT")]
    pub sprint_goal: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub comments: Option<String>,
}

/// Output format for reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Status values accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusArg {
    NotStarted,
    InProgress,
    Done,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::NotStarted => Status::NotStarted,
            StatusArg::InProgress => Status::InProgress,
            StatusArg::Done => Status::Done,
        }
    }
}

impl ItemFields {
    /// Convert the given flags into a raw record; unset flags are omitted.
    pub fn to_record(&self) -> RawRecord {
        let mut record = RawRecord::new();

        let texts = [
            (Column::EntityType, &self.entity_type),
            (Column::Id, &self.item_id),
            (Column::Name, &self.name),
            (Column::Team, &self.team),
            (Column::Sprint, &self.sprint),
            (Column::TeamSprint, &self.team_sprint),
            (Column::SprintGoal, &self.sprint_goal),
            (Column::Comments, &self.comments),
        ];
        for (column, value) in texts {
            if let Some(text) = value {
                record.insert(column.header(), RawValue::from(text.as_str()));
            }
        }

        let dates = [
            (Column::SprintStart, self.sprint_start),
            (Column::SprintEnd, self.sprint_end),
            (Column::StartDate, self.start_date),
            (Column::EndDate, self.end_date),
        ];
        for (column, value) in dates {
            if let Some(date) = value {
                record.insert(column.header(), RawValue::Date(date));
            }
        }

        if let Some(effort) = self.effort {
            record.insert(Column::Effort.header(), RawValue::Number(effort));
        }
        if let Some(status) = self.status {
            let status = Status::from(status).to_string();
            record.insert(Column::Status.header(), RawValue::Text(status));
        }

        record
    }

    /// Record for a new item: like `to_record`, with a Not Started status
    /// and zero effort when those flags are missing.
    pub fn to_new_record(&self) -> RawRecord {
        let mut record = self.to_record();
        if self.status.is_none() {
            record.insert(
                Column::Status.header(),
                RawValue::Text(Status::NotStarted.to_string()),
            );
        }
        if self.effort.is_none() {
            record.insert(Column::Effort.header(), RawValue::Number(0.0));
        }
        record
    }

    pub fn is_empty(&self) -> bool {
        self.to_record().is_empty()
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Add(fields) => fields.validate()?,
            Command::Edit { fields, .. } => {
                if fields.is_empty() {
                    return Err("Nothing to edit: pass at least one field".to_string());
                }
                fields.validate()?;
            }
            Command::Otd(otd) => {
                if let Some(pct) = otd.fail_below {
                    if !(0.0..=100.0).contains(&pct) {
                        return Err("--fail-below must be between 0 and 100".to_string());
                    }
                }
            }
            Command::Timeline { width: Some(0), .. } => {
                return Err("Timeline width must be at least 1".to_string());
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins over a config file that asks for verbose output.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl ItemFields {
    fn validate(&self) -> Result<(), String> {
        if let Some(effort) = self.effort {
            if !effort.is_finite() || effort < 0.0 {
                return Err("Effort must be a non-negative number".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            file: None,
            config: None,
            group_by: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_add() {
        let args = Args::try_parse_from([
            "storytracker",
            "add",
            "--id",
            "US-1",
            "--name",
            "Login",
            "--effort",
            "3",
            "--status",
            "in-progress",
            "--end-date",
            "2024-01-10",
        ])
        .unwrap();

        let Command::Add(fields) = args.command else {
            panic!("expected add");
        };
        assert_eq!(fields.item_id.as_deref(), Some("US-1"));
        assert_eq!(fields.status, Some(StatusArg::InProgress));
        assert_eq!(fields.end_date, Some(date(2024, 1, 10)));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "storytracker",
            "otd",
            "--sprint",
            "Core S1",
            "--file",
            "s.csv",
            "--group-by",
            "sprint",
        ])
        .unwrap();

        assert_eq!(args.file, Some(PathBuf::from("s.csv")));
        assert_eq!(args.group_by, Some(GroupBy::Sprint));
        assert!(matches!(args.command, Command::Otd(ref o) if o.sprint.as_deref() == Some("Core S1")));
    }

    #[test]
    fn test_rejects_bad_date() {
        let result = Args::try_parse_from(["storytracker", "add", "--end-date", "10-01-2024"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_to_record() {
        let fields = ItemFields {
            name: Some("Login".to_string()),
            effort: Some(2.0),
            status: Some(StatusArg::Done),
            end_date: Some(date(2024, 1, 10)),
            ..Default::default()
        };

        let record = fields.to_record();
        assert_eq!(
            record.get(Column::Name),
            Some(&RawValue::Text("Login".to_string()))
        );
        assert_eq!(record.get(Column::Effort), Some(&RawValue::Number(2.0)));
        assert_eq!(
            record.get(Column::Status),
            Some(&RawValue::Text("Done".to_string()))
        );
        assert_eq!(
            record.get(Column::EndDate),
            Some(&RawValue::Date(date(2024, 1, 10)))
        );
        assert_eq!(record.get(Column::Team), None);
    }

    #[test]
    fn test_to_new_record_defaults() {
        let record = ItemFields::default().to_new_record();

        assert_eq!(
            record.get(Column::Status),
            Some(&RawValue::Text("Not Started".to_string()))
        );
        assert_eq!(record.get(Column::Effort), Some(&RawValue::Number(0.0)));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Sprints);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_negative_effort() {
        let args = make_args(Command::Add(ItemFields {
            effort: Some(-1.0),
            ..Default::default()
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_edit() {
        let args = make_args(Command::Edit {
            row: 0,
            fields: ItemFields::default(),
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_fail_below_range() {
        let args = make_args(Command::Otd(OtdArgs {
            sprint: None,
            format: None,
            output: None,
            items: false,
            fail_below: Some(120.0),
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::Sprints);
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
