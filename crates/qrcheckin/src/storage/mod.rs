//! Local attendee sheet backed by `SQLite`.
//!
//! Holds the same positional table as the remote spreadsheet so an event can
//! run offline, and doubles as the sheet used in tests.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sheet::Worksheet;

/// A worksheet stored in a local database file.
#[derive(Debug)]
pub struct LocalSheet {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

/// Summary of the stored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetStats {
    /// Highest row holding a value (header included).
    pub rows: u32,
    /// Highest column holding a value.
    pub columns: u32,
    /// Number of non-empty cells.
    pub cells: u64,
}

impl LocalSheet {
    /// Open or create a sheet database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening local sheet at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Local sheet opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory sheet for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("local sheet connection lock poisoned"))
    }

    /// Replace the whole table with `rows` (first row is the header).
    ///
    /// Returns the number of non-empty cells stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is too large or the database write fails.
    pub fn import_rows(&self, rows: &[Vec<String>]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM cells", [])?;

        let mut stored = 0;
        {
            let mut insert =
                tx.prepare("INSERT INTO cells (row, col, value) VALUES (?1, ?2, ?3)")?;
            for (r, row) in rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    let (row_no, col_no) = (position(r)?, position(c)?);
                    insert.execute(params![row_no, col_no, value])?;
                    stored += 1;
                }
            }
        }
        tx.commit()?;

        info!(rows = rows.len(), cells = stored, "Imported local sheet");
        Ok(stored)
    }

    /// Summarize the stored table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<SheetStats> {
        let conn = self.conn()?;
        let (rows, columns, cells): (u32, u32, i64) = conn.query_row(
            "SELECT COALESCE(MAX(row), 0), COALESCE(MAX(col), 0), COUNT(*) FROM cells",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(SheetStats {
            rows,
            columns,
            cells: u64::try_from(cells).unwrap_or(0),
        })
    }

    fn read_all(&self) -> Result<Vec<Vec<String>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT row, col, value FROM cells ORDER BY row, col")?;
        let cells = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut table: Vec<Vec<String>> = Vec::new();
        for (row, col, value) in cells {
            let (r, c) = (index(row), index(col));
            if table.len() <= r {
                table.resize_with(r + 1, Vec::new);
            }
            let cells = &mut table[r];
            if cells.len() <= c {
                cells.resize(c + 1, String::new());
            }
            cells[c] = value;
        }
        Ok(table)
    }

    fn read_cell(&self, row: u32, col: u32) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM cells WHERE row = ?1 AND col = ?2",
                params![row, col],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    fn write_cell(&self, row: u32, col: u32, value: &str) -> Result<()> {
        if row == 0 || col == 0 {
            return Err(Error::sheet_schema(format!(
                "cell ({row}, {col}) is outside the sheet"
            )));
        }
        let conn = self.conn()?;
        if value.is_empty() {
            conn.execute(
                "DELETE FROM cells WHERE row = ?1 AND col = ?2",
                params![row, col],
            )?;
        } else {
            conn.execute(
                r"
                INSERT INTO cells (row, col, value) VALUES (?1, ?2, ?3)
                ON CONFLICT (row, col) DO UPDATE
                SET value = excluded.value, updated_at = datetime('now')
                ",
                params![row, col, value],
            )?;
        }
        debug!(row, col, "Local cell updated");
        Ok(())
    }
}

/// Parse an import file: a JSON array of rows, each an array of cells.
///
/// Strings are taken as-is, `null` becomes an empty cell and other scalars
/// use their JSON text (`42`, `true`).
///
/// # Errors
///
/// Returns an error if the input is not an array of arrays.
pub fn rows_from_json(raw: &str) -> Result<Vec<Vec<String>>> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(raw)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}

/// 0-based vector index to 1-based sheet position.
fn position(idx: usize) -> Result<u32> {
    u32::try_from(idx + 1).map_err(|_| Error::sheet_schema("table too large"))
}

/// 1-based sheet position to 0-based vector index.
fn index(pos: u32) -> usize {
    usize::try_from(pos.saturating_sub(1)).unwrap_or(usize::MAX)
}

#[async_trait]
impl Worksheet for LocalSheet {
    fn describe(&self) -> String {
        format!("local:{}", self.path.display())
    }

    async fn all_values(&self) -> Result<Vec<Vec<String>>> {
        self.read_all()
    }

    async fn cell(&self, row: u32, col: u32) -> Result<Option<String>> {
        self.read_cell(row, col)
    }

    async fn update_cell(&self, row: u32, col: u32, value: &str) -> Result<()> {
        self.write_cell(row, col, value)
    }
}
