//! Error types for fieldcompanion.
//!
//! This module defines all error types used throughout the fieldcompanion crate,
//! providing detailed context for debugging and plain-language messages for users.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fieldcompanion operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// An entry violates a store invariant.
    #[error("invalid entry: {message}")]
    EntryValidation {
        /// Description of the violated invariant.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Capture Errors ===
    /// Access to the location source was refused.
    #[error("location permission denied: {message}")]
    PermissionDenied {
        /// Description from the location source.
        message: String,
    },

    /// No position fix could be obtained.
    #[error("location unavailable: {message}")]
    LocationUnavailable {
        /// Why no fix was obtained.
        message: String,
    },

    /// An operation needs coordinates but none were acquired yet.
    #[error("no location acquired yet; acquire a location first")]
    NoLocation,

    /// The save policy requires at least one photo.
    #[error("at least one photo is required to save an entry")]
    PhotoRequired,

    // === Geocoding Errors ===
    /// No geocoding API key has been configured.
    #[error("no geocoding API key configured; run `fieldco settings set-api-key <KEY>`")]
    MissingCredential,

    /// The geocoding provider answered with a non-success status.
    #[error("geocoding failed ({status}): {message}")]
    Remote {
        /// Status reported by the provider.
        status: String,
        /// Provider message, or the status when none was given.
        message: String,
    },

    /// The geocoding request could not be completed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    // === Backup Errors ===
    /// A backup document could not be understood.
    #[error("invalid backup format: {message}")]
    InvalidBackupFormat {
        /// What was wrong with the document.
        message: String,
    },

    // === Image Errors ===
    /// An image could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// An image could not be re-encoded.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fieldcompanion operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a location-unavailable error.
    #[must_use]
    pub fn location_unavailable(message: impl Into<String>) -> Self {
        Self::LocationUnavailable {
            message: message.into(),
        }
    }

    /// Create a permission-denied error.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a remote geocoding error.
    #[must_use]
    pub fn remote(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-backup error.
    #[must_use]
    pub fn invalid_backup(message: impl Into<String>) -> Self {
        Self::InvalidBackupFormat {
            message: message.into(),
        }
    }

    /// Create an entry validation error.
    #[must_use]
    pub fn entry_validation(message: impl Into<String>) -> Self {
        Self::EntryValidation {
            message: message.into(),
        }
    }

    /// Check if this error is a location failure.
    #[must_use]
    pub fn is_location_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::LocationUnavailable { .. } | Self::NoLocation
        )
    }

    /// Check if the user can retry or continue the capture after this error.
    ///
    /// Location and geocoding failures leave the draft intact, so the user
    /// may retry or save without the missing piece.
    #[must_use]
    pub fn is_user_recoverable(&self) -> bool {
        self.is_location_error()
            || matches!(
                self,
                Self::MissingCredential
                    | Self::Remote { .. }
                    | Self::Network(_)
                    | Self::PhotoRequired
            )
    }
}
