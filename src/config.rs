//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.storytracker.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::{Classifier, DEFAULT_DATE_FORMAT};
use crate::cli::{Args, OutputFormat};
use crate::schema::GroupBy;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".storytracker.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Table layout settings.
    #[serde(default)]
    pub table: TableConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Path of the story table.
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            verbose: false,
        }
    }
}

fn default_data_file() -> String {
    "Story Tracker.csv".to_string()
}

/// How the table is read and grouped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// The one date format accepted when reading and used when writing.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Group items by sprint or by team and sprint.
    #[serde(default)]
    pub group_by: GroupBy,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            group_by: GroupBy::default(),
        }
    }
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// List the selected rows under the statistics.
    #[serde(default)]
    pub include_items: bool,

    /// Width of timeline bars in characters.
    #[serde(default = "default_timeline_width")]
    pub timeline_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_items: false,
            timeline_width: default_timeline_width(),
        }
    }
}

fn default_timeline_width() -> usize {
    60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or the defaults when it doesn't exist.
    ///
    /// A file that exists but can't be parsed or validated is an error:
    /// falling back would rewrite the table with the wrong date format.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings that would make every date unreadable.
    fn validate(&self) -> Result<()> {
        use std::fmt::Write;

        let probe = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap_or_default();
        let mut rendered = String::new();
        let formatted = write!(rendered, "{}", probe.format(&self.table.date_format)).is_ok();

        if !formatted
            || chrono::NaiveDate::parse_from_str(&rendered, &self.table.date_format).ok()
                != Some(probe)
        {
            anyhow::bail!(
                "date_format '{}' cannot round-trip a calendar date",
                self.table.date_format
            );
        }
        if self.report.timeline_width == 0 {
            anyhow::bail!("timeline_width must be at least 1");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref file) = args.file {
            self.general.data_file = file.display().to_string();
        }

        if let Some(group_by) = args.group_by {
            self.table.group_by = group_by;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Classifier configured with this table layout.
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.table.date_format.clone(), self.table.group_by)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.data_file, "Story Tracker.csv");
        assert_eq!(config.table.date_format, "%d-%m-%Y");
        assert_eq!(config.table.group_by, GroupBy::TeamSprint);
        assert_eq!(config.report.format, OutputFormat::Markdown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_file = "sprints.csv"
verbose = true

[table]
date_format = "%Y-%m-%d"
group_by = "sprint"

[report]
format = "json"
include_items = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_file, "sprints.csv");
        assert!(config.general.verbose);
        assert_eq!(config.table.date_format, "%Y-%m-%d");
        assert_eq!(config.table.group_by, GroupBy::Sprint);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert!(config.report.include_items);
        assert_eq!(config.report.timeline_width, 60);
    }

    #[test]
    fn test_rejects_unusable_date_format() {
        let mut config = Config::default();
        config.table.date_format = "%Y".to_string();
        assert!(config.validate().is_err());

        config.table.date_format = "%Q-%m".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[table]\ngroup_by = \"team-sprint\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.table.group_by, GroupBy::TeamSprint);
        assert_eq!(config.general.data_file, "Story Tracker.csv");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config.table.date_format, "%d-%m-%Y");
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        std::fs::write(&path, "[table]\ndate_format = \"%Y-%m-%d\"\ngroup_by = \"team\"\n").unwrap();
        assert!(Config::load_or_default(&path).is_err());

        std::fs::write(&path, "[table]\ndate_format = \"%Y\"\n").unwrap();
        assert!(Config::load_or_default(&path).is_err());

        std::fs::write(&path, "[table]\ndate_format = \"%Y-%m-%d\"\n").unwrap();
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.table.date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[table]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.table.date_format, "%d-%m-%Y");
    }
}
