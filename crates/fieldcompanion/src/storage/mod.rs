//! Storage layer for fieldcompanion.
//!
//! This module provides `SQLite`-based persistent storage for field entries
//! and the small settings table that holds the geocoding credential.

pub mod migrations;
pub mod schema;
mod settings;

use std::path::{Path, PathBuf};

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::entry::{Coordinates, Entry};
use crate::error::{Error, Result};
use crate::photo::{Photo, MAX_PHOTOS_PER_ENTRY};

pub use settings::API_KEY_SETTING;

const ENTRY_COLUMNS: &str =
    "id, created_at, memo, tags, visited, latitude, longitude, accuracy_m, address, photos";

/// Storage engine for field entries.
///
/// Every operation is a single `SQLite` statement, so each one is atomic on
/// its own; nothing spans several operations.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
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

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
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
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert an entry and return its newly assigned id.
    ///
    /// Any id already present on `entry` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryValidation`] if the entry carries too many photos
    /// or impossible coordinates, or an error if the database operation fails.
    pub fn insert(&self, entry: &Entry) -> Result<i64> {
        validate_entry(entry)?;

        let photos = serde_json::to_string(&entry.photos)?;
        let (latitude, longitude, accuracy_m) = match entry.coordinates {
            Some(c) => (Some(c.latitude), Some(c.longitude), Some(c.accuracy_m)),
            None => (None, None, None),
        };

        self.conn.execute(
            r"
            INSERT INTO entries
                (created_at, memo, tags, visited, latitude, longitude, accuracy_m, address, photos)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                entry.created_at,
                entry.memo,
                entry.tags,
                entry.visited,
                latitude,
                longitude,
                accuracy_m,
                entry.address,
                photos,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted entry {} with {} photos", id, entry.photos.len());
        Ok(id)
    }

    /// Get an entry by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<Entry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                [id],
                Self::row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Read every entry.
    ///
    /// Rows come back in id order, but callers needing an order should sort
    /// the result themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_all(&self) -> Result<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY id"))?;
        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Loaded {} entries", entries.len());
        Ok(entries)
    }

    /// Count stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete an entry by id.
    ///
    /// Returns `true` if an entry was deleted, `false` if none had that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM entries WHERE id = ?1", [id])?;
        if affected > 0 {
            info!("Deleted entry {}", id);
        }
        Ok(affected > 0)
    }

    /// Delete every entry, returning how many were removed.
    ///
    /// Settings are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<usize> {
        let affected = self.conn.execute("DELETE FROM entries", [])?;
        info!("Cleared {} entries", affected);
        Ok(affected)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (total_entries, visited_entries, oldest_created_at, newest_created_at): (
            i64,
            i64,
            Option<i64>,
            Option<i64>,
        ) = self.conn.query_row(
            r"
            SELECT COUNT(*), COALESCE(SUM(visited), 0), MIN(created_at), MAX(created_at)
            FROM entries
            ",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_entries,
            visited_entries,
            oldest_created_at,
            newest_created_at,
            db_size_bytes,
        })
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<Entry> {
        let latitude: Option<f64> = row.get(5)?;
        let longitude: Option<f64> = row.get(6)?;
        let accuracy_m: Option<f64> = row.get(7)?;
        let photos_json: String = row.get(9)?;

        let coordinates = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
                accuracy_m: accuracy_m.unwrap_or(0.0),
            }),
            _ => None,
        };

        let photos: Vec<Photo> = serde_json::from_str(&photos_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

        Ok(Entry {
            id: Some(row.get(0)?),
            created_at: row.get(1)?,
            memo: row.get(2)?,
            tags: row.get(3)?,
            visited: row.get(4)?,
            coordinates,
            address: row.get(8)?,
            photos,
        })
    }
}

fn validate_entry(entry: &Entry) -> Result<()> {
    if entry.photos.len() > MAX_PHOTOS_PER_ENTRY {
        return Err(Error::entry_validation(format!(
            "an entry holds at most {MAX_PHOTOS_PER_ENTRY} photos, got {}",
            entry.photos.len()
        )));
    }
    if let Some(coords) = entry.coordinates {
        if !coords.is_valid() {
            return Err(Error::entry_validation(format!(
                "coordinates out of range: {}",
                coords.lat_lng()
            )));
        }
    }
    Ok(())
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of entries stored.
    pub total_entries: i64,
    /// Entries flagged as visited.
    pub visited_entries: i64,
    /// Earliest `created_at`, epoch milliseconds.
    pub oldest_created_at: Option<i64>,
    /// Latest `created_at`, epoch milliseconds.
    pub newest_created_at: Option<i64>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
