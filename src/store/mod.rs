//! Table storage.
//!
//! The story table lives in one CSV file. It is read whole, reclassified,
//! and written back whole; each mutation takes the table by value and
//! returns the new one.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::analysis::Classifier;
use crate::error::{Result, TrackerError};
use crate::models::{Item, RawRecord, RawValue};
use crate::schema::{Column, GroupBy};

/// The classified story table together with its column layout.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    items: Vec<Item>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// An empty table with the default column layout.
    pub fn new() -> Self {
        Self {
            headers: Self::complete_headers(Vec::new()),
            items: Vec::new(),
        }
    }

    /// Build a table from raw rows, classifying each one.
    pub fn from_records(
        headers: Vec<String>,
        records: &[RawRecord],
        classifier: &Classifier,
    ) -> Self {
        Self {
            headers: Self::complete_headers(headers),
            items: classifier.classify(records),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a new row.
    pub fn with_added(mut self, record: &RawRecord, classifier: &Classifier) -> Self {
        self.adopt_extra_headers(record);
        self.items.push(classifier.classify_row(record));
        self
    }

    /// Overlay the given fields on an existing row and reclassify it.
    ///
    /// Changing the team or sprint without a new team-sprint value
    /// rebuilds the stored team-sprint from the new pair.
    pub fn with_edited(
        mut self,
        row: usize,
        changes: &RawRecord,
        classifier: &Classifier,
    ) -> Result<Self> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(row)
            .ok_or(TrackerError::RowOutOfRange { row, len })?;

        let regroup = changes.get(Column::TeamSprint).is_none()
            && (changes.get(Column::Team).is_some() || changes.get(Column::Sprint).is_some());

        let mut record = item.to_record(classifier.date_format());
        record.overlay(changes);
        if regroup {
            record.insert(Column::TeamSprint.header(), RawValue::Empty);
        }

        let mut edited = classifier.classify_row(&record);
        if regroup && !item.team_sprint.is_empty() {
            edited.team_sprint = GroupBy::TeamSprint.key(&edited.team, &edited.sprint, "");
        }
        *item = edited;

        self.adopt_extra_headers(changes);
        Ok(self)
    }

    /// Remove a row.
    pub fn without_row(mut self, row: usize) -> Result<Self> {
        let len = self.items.len();
        if row >= len {
            return Err(TrackerError::RowOutOfRange { row, len });
        }
        self.items.remove(row);
        Ok(self)
    }

    /// Cell text for every row, in header order.
    pub fn rows_text(&self, date_format: &str) -> Vec<Vec<String>> {
        self.items
            .iter()
            .map(|item| {
                self.headers
                    .iter()
                    .map(|header| match Column::from_header(header) {
                        Some(column) => item.column_text(column, date_format),
                        None => item.extra.get(header).cloned().unwrap_or_default(),
                    })
                    .collect()
            })
            .collect()
    }

    /// Append any schema column the source lacked.
    fn complete_headers(mut headers: Vec<String>) -> Vec<String> {
        for column in Column::ALL {
            let present = headers
                .iter()
                .any(|h| Column::from_header(h) == Some(column));
            if !present && column.is_required() {
                headers.push(column.header().to_string());
            }
        }
        headers
    }

    fn adopt_extra_headers(&mut self, record: &RawRecord) {
        for (header, _) in record.extras() {
            if !self.headers.contains(header) {
                self.headers.push(header.clone());
            }
        }
        if record.get(Column::TeamSprint).is_some()
            && !self
                .headers
                .iter()
                .any(|h| Column::from_header(h) == Some(Column::TeamSprint))
        {
            self.headers.push(Column::TeamSprint.header().to_string());
        }
    }
}

/// Load and classify the table file.
pub fn read_table(path: &Path, classifier: &Classifier) -> Result<Table> {
    if !path.exists() {
        return Err(TrackerError::TableNotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let table = parse_table(file, classifier)?;

    info!("Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Parse CSV table content.
pub fn parse_table<R: Read>(reader: R, classifier: &Classifier) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    debug!("Table headers: {:?}", headers);

    for column in [Column::EndDate, Column::SprintEnd, Column::Status] {
        if !headers.iter().any(|h| Column::from_header(h) == Some(column)) {
            warn!("Table has no '{}' column", column.header());
        }
    }

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let row = result?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut record = RawRecord::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            record.insert(header.clone(), RawValue::from(cell));
        }
        records.push(record);
    }

    let table = Table::from_records(headers, &records, classifier);

    let undated = table
        .items()
        .iter()
        .filter(|item| item.end_date.is_none() || item.group_end.is_none())
        .count();
    if undated > 0 {
        debug!(
            "{} rows lack an end date or sprint end; they count as not spilled over",
            undated
        );
    }

    Ok(table)
}

/// Write the table as CSV.
pub fn render_table<W: Write>(table: &Table, writer: W, date_format: &str) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(table.headers())?;
    for row in table.rows_text(date_format) {
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Replace the table file with the given table.
///
/// The content goes to a temporary file next to the target first and is
/// then renamed over it.
pub fn write_table(table: &Table, path: &Path, date_format: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    render_table(table, temp.as_file_mut(), date_format)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| TrackerError::Io(e.error))?;

    info!("Saved {} rows to {}", table.len(), path.display());
    Ok(())
}
