//! `SQLite` schema definitions for fieldcompanion.

/// SQL statement to create the entries table.
///
/// `AUTOINCREMENT` keeps ids from being reused after deletes or a clear.
/// Photos are a JSON array of data URLs.
pub const CREATE_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at INTEGER NOT NULL,
    memo TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '',
    visited INTEGER NOT NULL DEFAULT 0,
    latitude REAL,
    longitude REAL,
    accuracy_m REAL,
    address TEXT,
    photos TEXT NOT NULL DEFAULT '[]',
    CHECK ((latitude IS NULL) = (longitude IS NULL))
)
";

/// Index on `created_at`, the default sort key.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at)
";

/// Index on `visited` for the visited/unvisited filter.
pub const CREATE_VISITED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_visited ON entries(visited)
";

/// SQL statement to create the user settings table.
pub const CREATE_SETTINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for internal key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ENTRIES_TABLE,
    CREATE_CREATED_AT_INDEX,
    CREATE_VISITED_INDEX,
    CREATE_SETTINGS_TABLE,
    CREATE_METADATA_TABLE,
];
