//! Journal schema definitions

/// SQL schema for the journal database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl sessions
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Every appended record, in discovery order per dataset
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset TEXT NOT NULL,
    identifier TEXT NOT NULL,
    payload TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_dataset ON records(dataset, id);

-- Delivered cursor per dataset
CREATE TABLE IF NOT EXISTS cursors (
    dataset TEXT PRIMARY KEY,
    delivered INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Detail identifiers whose records have been appended
CREATE TABLE IF NOT EXISTS processed (
    identifier TEXT PRIMARY KEY,
    processed_at TEXT NOT NULL
);
"#;

/// Initializes the journal schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
