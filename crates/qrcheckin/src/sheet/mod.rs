//! Attendee spreadsheet access.
//!
//! The sheet is positional: row 1 holds headers, every following row is one
//! attendee, and the entry stamp lives in a fixed column. Backends only need
//! to read the whole table and read or write single cells; lookup and the
//! entry marker are written once on top of [`Worksheet`].

pub mod google;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, info};

use crate::attendee::{Attendee, EntryMark};
use crate::error::{Error, Result};

pub use google::GoogleSheet;

/// Row and column access to one worksheet.
///
/// Rows and columns are 1-based, as in the spreadsheet UI.
#[async_trait]
pub trait Worksheet: Send + Sync {
    /// A short description of where the data lives (for logging).
    fn describe(&self) -> String;

    /// Fetch every row, header included. Trailing empty cells may be omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn all_values(&self) -> Result<Vec<Vec<String>>>;

    /// Read one cell. Empty cells read as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn cell(&self, row: u32, col: u32) -> Result<Option<String>>;

    /// Overwrite one cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    async fn update_cell(&self, row: u32, col: u32, value: &str) -> Result<()>;
}

/// Where the interesting columns are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// Header of the identifier column.
    pub id_header: String,
    /// Header of the name column.
    pub name_header: String,
    /// Header of the registration column.
    pub registration_header: String,
    /// 1-based column holding the entry stamp.
    pub entry_column: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            id_header: "ID".to_string(),
            name_header: "Name".to_string(),
            registration_header: "Registration".to_string(),
            entry_column: 9,
        }
    }
}

/// Find the first record whose identifier cell equals `id` exactly.
///
/// An empty `id` never matches, so blank rows are never picked.
///
/// `values` is the full table as returned by [`Worksheet::all_values`].
///
/// # Errors
///
/// Returns [`Error::SheetSchema`] if the table has a header row without the
/// identifier header.
pub fn find_attendee(
    values: &[Vec<String>],
    id: &str,
    layout: &SheetLayout,
) -> Result<Option<Attendee>> {
    if id.is_empty() {
        return Ok(None);
    }
    let Some((header, records)) = values.split_first() else {
        return Ok(None);
    };

    // First occurrence wins for duplicate headers
    let mut columns: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in header.iter().enumerate() {
        columns.entry(name.as_str()).or_insert(idx);
    }

    let id_col = *columns.get(layout.id_header.as_str()).ok_or_else(|| {
        Error::sheet_schema(format!("header row has no {:?} column", layout.id_header))
    })?;
    let name_col = columns.get(layout.name_header.as_str()).copied();
    let registration_col = columns.get(layout.registration_header.as_str()).copied();
    let entry_col = usize::try_from(layout.entry_column)
        .ok()
        .and_then(|c| c.checked_sub(1));

    let cell = |row: &[String], col: Option<usize>| -> String {
        col.and_then(|c| row.get(c)).cloned().unwrap_or_default()
    };

    for (idx, record) in records.iter().enumerate() {
        if cell(record, Some(id_col)) != id {
            continue;
        }

        // Records start on the second sheet row
        let row = u32::try_from(idx + 2)
            .map_err(|_| Error::sheet_schema("sheet has more rows than fit in u32"))?;
        let entry_time = Some(cell(record, entry_col)).filter(|t| !t.is_empty());

        return Ok(Some(Attendee {
            id: id.to_string(),
            name: cell(record, name_col),
            registration: cell(record, registration_col),
            row,
            entry_time,
        }));
    }

    Ok(None)
}

/// Fetch the whole sheet and look `id` up.
///
/// # Errors
///
/// Returns an error if the sheet cannot be read or has no identifier column.
pub async fn lookup(
    sheet: &dyn Worksheet,
    id: &str,
    layout: &SheetLayout,
) -> Result<Option<Attendee>> {
    let values = sheet.all_values().await?;
    debug!(
        sheet = %sheet.describe(),
        rows = values.len().saturating_sub(1),
        id,
        "Scanning sheet for identifier"
    );
    find_attendee(&values, id, layout)
}

/// Stamp `timestamp` into the entry cell of `row` unless it already holds a
/// value.
///
/// # Errors
///
/// Returns an error if the cell cannot be read or written.
pub async fn mark_entry(
    sheet: &dyn Worksheet,
    row: u32,
    layout: &SheetLayout,
    timestamp: &str,
) -> Result<EntryMark> {
    let col = layout.entry_column;
    if let Some(existing) = sheet.cell(row, col).await? {
        if !existing.is_empty() {
            debug!(row, col, existing = %existing, "Entry already recorded");
            return Ok(EntryMark::AlreadyEntered(existing));
        }
    }

    sheet.update_cell(row, col, timestamp).await?;
    info!(row, col, at = %timestamp, "Entry marked");
    Ok(EntryMark::Marked(timestamp.to_string()))
}

/// Format an entry stamp with a `chrono` format string.
#[must_use]
pub fn format_entry_time<Tz>(at: &DateTime<Tz>, format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(format).to_string()
}

/// The current local time as an entry stamp.
#[must_use]
pub fn entry_time_now(format: &str) -> String {
    format_entry_time(&Local::now(), format)
}

/// Convert a 1-based column index to its A1 letters (`1` -> `A`, `27` -> `AA`).
#[must_use]
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        // rem < 26, so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + rem as u8));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 notation for a single cell, e.g. `I5`.
#[must_use]
pub fn a1_cell(row: u32, col: u32) -> String {
    format!("{}{row}", column_letters(col))
}
