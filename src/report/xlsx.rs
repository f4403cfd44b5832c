//! Spreadsheet export of the classified table.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::info;

use crate::error::Result;
use crate::schema::Column;
use crate::store::Table;

/// Build the workbook bytes: a bold header row, then one row per item in
/// the table's column layout. Effort is written as a number, everything
/// else (dates included) as text.
pub fn to_xlsx(table: &Table, date_format: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let header_format = Format::new().set_bold();

    for (col, header) in table.headers().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    let effort_col = table
        .headers()
        .iter()
        .position(|h| Column::from_header(h) == Some(Column::Effort));

    for (row, cells) in table.rows_text(date_format).iter().enumerate() {
        let row = (row + 1) as u32;
        for (col, cell) in cells.iter().enumerate() {
            let number = match effort_col {
                Some(effort) if effort == col => cell.parse::<f64>().ok(),
                _ => None,
            };
            match number {
                Some(n) => worksheet.write_number(row, col as u16, n)?,
                None => worksheet.write_string(row, col as u16, cell)?,
            };
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Write the table to an `.xlsx` file.
pub fn export_xlsx(table: &Table, path: &Path, date_format: &str) -> Result<()> {
    let buffer = to_xlsx(table, date_format)?;
    std::fs::write(path, buffer)?;

    info!("Exported {} rows to {}", table.len(), path.display());
    Ok(())
}
