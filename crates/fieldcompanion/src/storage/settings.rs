//! Persisted user settings.
//!
//! Settings share the entry database. Writes are last-write-wins with no
//! history; the only setting today is the geocoding API key.

use rusqlite::OptionalExtension;
use tracing::debug;

use super::Storage;
use crate::error::Result;

/// Settings key holding the geocoding API key.
pub const API_KEY_SETTING: &str = "geocoding_api_key";

impl Storage {
    /// Read a setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Write a setting, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        debug!("Updated setting {}", key);
        Ok(())
    }

    /// Remove a setting. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_setting(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// The stored geocoding API key. Blank values read as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn api_key(&self) -> Result<Option<String>> {
        Ok(self
            .setting(API_KEY_SETTING)?
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()))
    }

    /// Store the geocoding API key (trimmed).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_api_key(&self, key: &str) -> Result<()> {
        self.set_setting(API_KEY_SETTING, key.trim())
    }

    /// Forget the geocoding API key. Returns `true` if one was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear_api_key(&self) -> Result<bool> {
        self.remove_setting(API_KEY_SETTING)
    }
}
