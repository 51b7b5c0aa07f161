//! `SQLite` schema for the local attendee sheet.
//!
//! The sheet is stored sparsely: one row per non-empty cell, addressed by
//! 1-based row and column exactly as in the spreadsheet UI.

/// SQL statement to create the cells table.
pub const CREATE_CELLS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS cells (
    row INTEGER NOT NULL CHECK (row >= 1),
    col INTEGER NOT NULL CHECK (col >= 1),
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (row, col)
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_CELLS_TABLE, CREATE_METADATA_TABLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_table_is_keyed_by_position() {
        assert!(CREATE_CELLS_TABLE.contains("PRIMARY KEY (row, col)"));
        assert!(CREATE_CELLS_TABLE.contains("value TEXT NOT NULL"));
    }

    #[test]
    fn test_schema_statements_execute() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for stmt in SCHEMA_STATEMENTS {
            conn.execute(stmt, []).unwrap();
        }
        let rejected = conn.execute("INSERT INTO cells (row, col, value) VALUES (0, 1, 'x')", []);
        assert!(rejected.is_err());
    }
}
