//! JSON backup export and import.
//!
//! A backup is `{"version": 1, "data": [record, ...]}` where each record is a
//! flat object:
//!
//! ```json
//! {"id": 1, "createdAt": 1700000000000, "memo": "", "tags": "", "visited": false,
//!  "lat": 35.681236, "lng": 139.767125, "accuracy": 12, "addr": "", "photos": []}
//! ```
//!
//! Import also accepts a bare array of records. It is strictly additive:
//! embedded ids are ignored and every record becomes a new entry.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::entry::{Coordinates, Entry};
use crate::error::{Error, Result};
use crate::photo::{Photo, MAX_PHOTOS_PER_ENTRY};
use crate::storage::Storage;

/// Backup format version written and accepted.
pub const BACKUP_VERSION: u64 = 1;

/// A complete backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    /// Format version.
    pub version: u64,
    /// Exported records.
    pub data: Vec<BackupRecord>,
}

/// One exported entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    /// Id in the exporting store. Never read back on import.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Memo text.
    #[serde(default)]
    pub memo: String,
    /// Tag text.
    #[serde(default)]
    pub tags: String,
    /// Visited flag.
    #[serde(default)]
    pub visited: bool,
    /// Latitude.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude.
    #[serde(default)]
    pub lng: Option<f64>,
    /// Accuracy radius in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Address text; empty when none.
    #[serde(default)]
    pub addr: Option<String>,
    /// Inline photos.
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl From<&Entry> for BackupRecord {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            created_at: Some(entry.created_at),
            memo: entry.memo.clone(),
            tags: entry.tags.clone(),
            visited: entry.visited,
            lat: entry.coordinates.map(|c| c.latitude),
            lng: entry.coordinates.map(|c| c.longitude),
            accuracy: entry.coordinates.map(|c| c.accuracy_m),
            addr: Some(entry.address.clone().unwrap_or_default()),
            photos: entry.photos.clone(),
        }
    }
}

impl BackupRecord {
    /// Convert to a new, unsaved entry.
    ///
    /// `imported_at` stands in for a missing creation time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBackupFormat`] if the record breaks an entry
    /// invariant.
    pub fn into_entry(self, imported_at: i64) -> Result<Entry> {
        if self.photos.len() > MAX_PHOTOS_PER_ENTRY {
            return Err(Error::invalid_backup(format!(
                "record has {} photos, at most {} allowed",
                self.photos.len(),
                MAX_PHOTOS_PER_ENTRY
            )));
        }

        let coordinates = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => {
                let coords = Coordinates::new(lat, lng, self.accuracy.unwrap_or(0.0));
                if !coords.is_valid() {
                    return Err(Error::invalid_backup(format!(
                        "coordinates out of range: {}",
                        coords.lat_lng()
                    )));
                }
                Some(coords)
            }
            (None, None) => None,
            _ => return Err(Error::invalid_backup("record has only one of lat and lng")),
        };

        Ok(
            Entry::new(self.memo, self.tags, self.visited)
                .with_created_at(self.created_at.unwrap_or(imported_at))
                .with_coordinates(coordinates)
                .with_address(self.addr)
                .with_photos(self.photos),
        )
    }
}

/// Snapshot the whole store as a backup document.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn export(storage: &Storage) -> Result<BackupDocument> {
    let data: Vec<BackupRecord> = storage.get_all()?.iter().map(BackupRecord::from).collect();
    debug!("Exporting {} entries", data.len());
    Ok(BackupDocument {
        version: BACKUP_VERSION,
        data,
    })
}

/// Pretty-printed JSON for a backup document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(document: &BackupDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// File name for a backup taken now.
#[must_use]
pub fn default_file_name() -> String {
    format!(
        "field-companion-backup-{}.json",
        Utc::now().timestamp_millis()
    )
}

/// Export the store to `path`, or to [`default_file_name`] in the current
/// directory. Returns the written path and the number of records.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the file written.
pub fn export_to_path(storage: &Storage, path: Option<&Path>) -> Result<(PathBuf, usize)> {
    let path = path.map_or_else(|| PathBuf::from(default_file_name()), Path::to_path_buf);
    let document = export(storage)?;
    std::fs::write(&path, to_json(&document)?)?;
    info!(
        "Exported {} entries to {}",
        document.data.len(),
        path.display()
    );
    Ok((path, document.data.len()))
}

/// Parse backup text into entries ready to insert.
///
/// The whole document is checked before anything is returned.
///
/// # Errors
///
/// Returns [`Error::InvalidBackupFormat`] if the text is not a backup.
pub fn parse(text: &str) -> Result<Vec<Entry>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::invalid_backup(format!("not valid JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => {
            match object.get("version") {
                None => {}
                Some(v) if v.as_u64() == Some(BACKUP_VERSION) => {}
                Some(v) => return Err(Error::invalid_backup(format!("unsupported version {v}"))),
            }
            match object.remove("data") {
                Some(Value::Array(items)) => items,
                _ => return Err(Error::invalid_backup("missing \"data\" array")),
            }
        }
        _ => {
            return Err(Error::invalid_backup(
                "expected a backup object or an array of records",
            ))
        }
    };

    let imported_at = Utc::now().timestamp_millis();
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(Error::invalid_backup(format!(
                    "record {index} is not an object"
                )));
            }
            let record: BackupRecord = serde_json::from_value(item)
                .map_err(|e| Error::invalid_backup(format!("record {index}: {e}")))?;
            record.into_entry(imported_at).map_err(|e| match e {
                Error::InvalidBackupFormat { message } => {
                    Error::invalid_backup(format!("record {index}: {message}"))
                }
                other => other,
            })
        })
        .collect()
}

/// Import backup text into the store. Returns the number of new entries.
///
/// Nothing is inserted if the document is invalid. A store failure part way
/// through keeps the entries inserted before it.
///
/// # Errors
///
/// Returns [`Error::InvalidBackupFormat`] for a bad document, or a storage
/// error.
pub fn import_from_str(storage: &Storage, text: &str) -> Result<usize> {
    let entries = parse(text)?;
    for entry in &entries {
        storage.insert(entry)?;
    }
    info!("Imported {} entries", entries.len());
    Ok(entries.len())
}

/// Import the backup file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, see [`import_from_str`].
pub fn import_from_path(storage: &Storage, path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path)?;
    import_from_str(storage, &text)
}
