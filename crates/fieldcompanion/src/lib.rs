//! `fieldcompanion` - Record field visits with photos, position and address
//!
//! This library provides the entry store, photo normalization, location and
//! reverse-geocoding clients, the capture workflow, listing and JSON backups
//! behind the `fieldco` binary.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod backup;
pub mod capture;
pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
pub mod geocode;
pub mod links;
pub mod logging;
pub mod photo;
pub mod storage;
pub mod view;

pub use capture::{CaptureController, DraftSession, DraftState, LocationProvider, SavePolicy};
pub use config::Config;
pub use entry::{Coordinates, Entry};
pub use error::{Error, Result};
pub use geocode::{Geocoder, GoogleGeocoder};
pub use logging::init_logging;
pub use photo::{Photo, PhotoNormalizer};
pub use storage::{Storage, StorageStats};
pub use view::{EntryQuery, OutputFormat};
