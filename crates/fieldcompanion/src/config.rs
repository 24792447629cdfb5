//! Configuration management for fieldcompanion.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::capture::LocationRequest;
use crate::error::{Error, Result};
use crate::links::{LinkTemplates, LAT_PLACEHOLDER, LNG_PLACEHOLDER};
use crate::photo::{PhotoNormalizer, MAX_PHOTOS_PER_ENTRY};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fieldcompanion";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "entries.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FIELDCOMPANION_`, sections
///    separated by `__`, e.g. `FIELDCOMPANION_PHOTOS__MAX_EDGE=1200`)
/// 2. TOML config file at `~/.config/fieldcompanion/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Capture policy.
    pub capture: CaptureConfig,
    /// Location source configuration.
    pub location: LocationConfig,
    /// Photo normalization.
    pub photos: PhotoConfig,
    /// Reverse geocoding.
    pub geocoding: GeocodingConfig,
    /// External map and zoning links.
    pub links: LinksConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/fieldcompanion/entries.db`
    pub database_path: Option<PathBuf>,
}

/// Capture policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Refuse to save an entry that has no photo.
    pub require_photo: bool,
}

/// Location source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Address of the gpsd daemon used by `--gps`.
    pub gpsd_address: String,
    /// How long to wait for a fix, in milliseconds.
    pub timeout_ms: u64,
    /// Only accept 3D fixes.
    pub high_accuracy: bool,
}

/// Photo normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Longest edge of a stored photo, in pixels.
    pub max_edge: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Photos kept per entry.
    pub max_photos: usize,
}

/// Reverse geocoding settings.
///
/// The API key itself is not part of the configuration; it lives in the
/// settings table of the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// Geocoding endpoint.
    pub endpoint: String,
    /// Language of returned addresses.
    pub language: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// External link templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Map viewer URL with `{lat}` and `{lng}` placeholders.
    pub map_url: String,
    /// Zoning viewer URL with `{lat}` and `{lng}` placeholders.
    pub zoning_url: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            gpsd_address: "127.0.0.1:2947".to_string(),
            timeout_ms: 15_000,
            high_accuracy: true,
        }
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            max_edge: 1600,
            jpeg_quality: 80,
            max_photos: MAX_PHOTOS_PER_ENTRY,
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            language: "ja".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        let templates = LinkTemplates::default();
        Self {
            map_url: templates.map_url,
            zoning_url: templates.zoning_url,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FIELDCOMPANION_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.location.timeout_ms == 0 {
            return Err(invalid("location.timeout_ms must be greater than 0"));
        }

        if self.photos.max_edge == 0 {
            return Err(invalid("photos.max_edge must be greater than 0"));
        }

        if !(1..=100).contains(&self.photos.jpeg_quality) {
            return Err(invalid(format!(
                "photos.jpeg_quality must be between 1 and 100, got {}",
                self.photos.jpeg_quality
            )));
        }

        if !(1..=MAX_PHOTOS_PER_ENTRY).contains(&self.photos.max_photos) {
            return Err(invalid(format!(
                "photos.max_photos must be between 1 and {MAX_PHOTOS_PER_ENTRY}, got {}",
                self.photos.max_photos
            )));
        }

        if self.geocoding.timeout_secs == 0 {
            return Err(invalid("geocoding.timeout_secs must be greater than 0"));
        }

        if reqwest::Url::parse(&self.geocoding.endpoint).is_err() {
            return Err(invalid(format!(
                "geocoding.endpoint is not a valid URL: {}",
                self.geocoding.endpoint
            )));
        }

        for (name, template) in [
            ("links.map_url", &self.links.map_url),
            ("links.zoning_url", &self.links.zoning_url),
        ] {
            if !template.contains(LAT_PLACEHOLDER) || !template.contains(LNG_PLACEHOLDER) {
                return Err(invalid(format!(
                    "{name} must contain {LAT_PLACEHOLDER} and {LNG_PLACEHOLDER}"
                )));
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the location timeout as a Duration.
    #[must_use]
    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location.timeout_ms)
    }

    /// Build the location request described by this configuration.
    ///
    /// Cached fixes are never accepted.
    #[must_use]
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            high_accuracy: self.location.high_accuracy,
            timeout: self.location_timeout(),
            maximum_age: Duration::ZERO,
        }
    }

    /// Get the geocoding request timeout as a Duration.
    #[must_use]
    pub fn geocoding_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoding.timeout_secs)
    }

    /// Build the photo normalizer described by this configuration.
    #[must_use]
    pub fn photo_normalizer(&self) -> PhotoNormalizer {
        PhotoNormalizer {
            max_edge: self.photos.max_edge,
            jpeg_quality: self.photos.jpeg_quality,
            max_photos: self.photos.max_photos,
        }
    }

    /// Build the link templates described by this configuration.
    #[must_use]
    pub fn link_templates(&self) -> LinkTemplates {
        LinkTemplates {
            map_url: self.links.map_url.clone(),
            zoning_url: self.links.zoning_url.clone(),
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(!config.capture.require_photo);
        assert!(config.location.high_accuracy);
        assert_eq!(config.location.timeout_ms, 15_000);
        assert_eq!(config.photos.max_edge, 1600);
        assert_eq!(config.photos.jpeg_quality, 80);
        assert_eq!(config.photos.max_photos, 5);
        assert_eq!(config.geocoding.language, "ja");
    }

    #[test]
    fn test_location_request() {
        let mut config = Config::default();
        config.location.timeout_ms = 2_500;
        config.location.high_accuracy = false;

        let request = config.location_request();
        assert_eq!(request.timeout, Duration::from_millis(2_500));
        assert!(!request.high_accuracy);
        assert_eq!(request.maximum_age, Duration::ZERO);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_location_timeout() {
        let mut config = Config::default();
        config.location.timeout_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("location.timeout_ms"));
    }

    #[test]
    fn test_validate_jpeg_quality_range() {
        let mut config = Config::default();
        config.photos.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.photos.jpeg_quality = 101;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("jpeg_quality"));

        config.photos.jpeg_quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_photos_bounded() {
        let mut config = Config::default();
        config.photos.max_photos = 6;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_photos"));

        config.photos.max_photos = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_endpoint() {
        let mut config = Config::default();
        config.geocoding.endpoint = "not a url".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("geocoding.endpoint"));
    }

    #[test]
    fn test_validate_link_template_placeholders() {
        let mut config = Config::default();
        config.links.zoning_url = "https://example.com/zoning".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("links.zoning_url"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("entries.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.location_timeout(), Duration::from_secs(15));
        assert_eq!(config.geocoding_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_photo_normalizer_from_config() {
        let mut config = Config::default();
        config.photos.max_edge = 800;

        let normalizer = config.photo_normalizer();
        assert_eq!(normalizer.max_edge, 800);
        assert_eq!(normalizer.jpeg_quality, 80);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("fieldcompanion"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[capture]\nrequire_photo = true\n\n[photos]\nmax_edge = 1024\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert!(config.capture.require_photo);
        assert_eq!(config.photos.max_edge, 1024);
        assert_eq!(config.photos.jpeg_quality, 80);
    }

    #[test]
    fn test_load_file_sections_reach_every_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[location]\ngpsd_address = \"10.0.0.5:2947\"\n\n\
             [geocoding]\nlanguage = \"en\"\n\n\
             [links]\nmap_url = \"https://maps.example/?q={lat},{lng}\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.location.gpsd_address, "10.0.0.5:2947");
        assert_eq!(config.geocoding.language, "en");
        assert_eq!(config.links.map_url, "https://maps.example/?q={lat},{lng}");
        assert_eq!(config.links.zoning_url, LinksConfig::default().zoning_url);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[photos]\nmax_photos = 9\n").unwrap();

        let result = Config::load_from(Some(path));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_config_serialize_roundtrip_keys() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("require_photo"));
        assert!(json.contains("gpsd_address"));
        assert!(json.contains("zoning_url"));
    }
}
