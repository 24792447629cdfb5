//! Core record types for fieldcompanion.
//!
//! An [`Entry`] is one recorded field visit: free-text memo and tags, a
//! visited flag, an optional position fix, an optional resolved address and
//! up to five inline photos.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::photo::Photo;

/// Decimal places kept for latitude and longitude.
pub const COORDINATE_DECIMALS: i32 = 6;

/// A position fix.
///
/// Latitude and longitude are kept at [`COORDINATE_DECIMALS`] places and the
/// accuracy radius is rounded to whole meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy_m: f64,
}

impl Coordinates {
    /// Create coordinates, rounding to the stored precision.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        let factor = 10f64.powi(COORDINATE_DECIMALS);
        Self {
            latitude: (latitude * factor).round() / factor,
            longitude: (longitude * factor).round() / factor,
            accuracy_m: accuracy_m.max(0.0).round(),
        }
    }

    /// `lat,lng` formatted at the stored precision.
    #[must_use]
    pub fn lat_lng(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }

    /// Check that the fix lies on the globe.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy_m.is_finite()
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.6}, {:.6} (±{}m)",
            self.latitude, self.longitude, self.accuracy_m
        )
    }
}

/// A recorded field visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Identifier assigned by the storage layer; `None` until inserted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Creation time in epoch milliseconds.
    pub created_at: i64,

    /// Free-text memo.
    #[serde(default)]
    pub memo: String,

    /// Free-text tags, whitespace separated by convention.
    #[serde(default)]
    pub tags: String,

    /// Whether the site has been visited.
    #[serde(default)]
    pub visited: bool,

    /// Position fix, if one was acquired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    /// Resolved address, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Normalized photos, at most five.
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl Entry {
    /// Create a new entry stamped with the current time.
    #[must_use]
    pub fn new(memo: impl Into<String>, tags: impl Into<String>, visited: bool) -> Self {
        Self {
            id: None,
            created_at: Utc::now().timestamp_millis(),
            memo: memo.into(),
            tags: tags.into(),
            visited,
            coordinates: None,
            address: None,
            photos: Vec::new(),
        }
    }

    /// Set the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Attach a position fix.
    #[must_use]
    pub fn with_coordinates(mut self, coordinates: Option<Coordinates>) -> Self {
        self.coordinates = coordinates;
        self
    }

    /// Attach an address; blank text counts as no address.
    #[must_use]
    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.address = normalize_address(address);
        self
    }

    /// Attach photos.
    #[must_use]
    pub fn with_photos(mut self, photos: Vec<Photo>) -> Self {
        self.photos = photos;
        self
    }

    /// Creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.created_at)
            .single()
            .unwrap_or_default()
    }

    /// Creation time formatted in local time as `YYYY-MM-DD HH:MM`.
    #[must_use]
    pub fn created_at_display(&self) -> String {
        self.created_at_utc()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }

    /// Tags rendered as `#tag` labels.
    #[must_use]
    pub fn tag_labels(&self) -> Vec<String> {
        self.tags
            .split_whitespace()
            .map(|tag| {
                if tag.starts_with('#') {
                    tag.to_string()
                } else {
                    format!("#{tag}")
                }
            })
            .collect()
    }

    /// Check whether `needle` (already lowercased) occurs in the memo, tags
    /// or address, ignoring case.
    #[must_use]
    pub fn matches_text(&self, needle: &str) -> bool {
        [
            self.memo.as_str(),
            self.tags.as_str(),
            self.address.as_deref().unwrap_or_default(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Trim an address and drop it when blank.
#[must_use]
pub fn normalize_address(address: Option<String>) -> Option<String> {
    address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_rounding() {
        let coords = Coordinates::new(35.681_236_789, 139.767_125_444, 12.6);
        assert!((coords.latitude - 35.681_237).abs() < 1e-9);
        assert!((coords.longitude - 139.767_125).abs() < 1e-9);
        assert!((coords.accuracy_m - 13.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coordinates_negative_accuracy_clamped() {
        let coords = Coordinates::new(0.0, 0.0, -4.0);
        assert!(coords.accuracy_m.abs() < f64::EPSILON);
    }

    #[test]
    fn test_coordinates_lat_lng() {
        let coords = Coordinates::new(35.5, -120.25, 5.0);
        assert_eq!(coords.lat_lng(), "35.500000,-120.250000");
    }

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(35.0, 139.0, 5.0).is_valid());
        assert!(!Coordinates::new(95.0, 139.0, 5.0).is_valid());
        assert!(!Coordinates::new(35.0, 200.0, 5.0).is_valid());
    }

    #[test]
    fn test_entry_new() {
        let entry = Entry::new("near riverside park", "lot corner", true);

        assert!(entry.id.is_none());
        assert!(entry.created_at > 0);
        assert!(entry.visited);
        assert!(entry.coordinates.is_none());
        assert!(entry.photos.is_empty());
    }

    #[test]
    fn test_with_address_blank_is_none() {
        let entry = Entry::new("", "", false).with_address(Some("   ".to_string()));
        assert!(entry.address.is_none());

        let entry = Entry::new("", "", false).with_address(Some(" Tokyo ".to_string()));
        assert_eq!(entry.address.as_deref(), Some("Tokyo"));
    }

    #[test]
    fn test_tag_labels() {
        let entry = Entry::new("", "corner  #vacant lot", false);
        assert_eq!(entry.tag_labels(), vec!["#corner", "#vacant", "#lot"]);

        let entry = Entry::new("", "", false);
        assert!(entry.tag_labels().is_empty());
    }

    #[test]
    fn test_matches_text() {
        let entry = Entry::new("Near Riverside Park", "", false)
            .with_address(Some("1-2-3 Chiyoda".to_string()));

        assert!(entry.matches_text("riverside"));
        assert!(entry.matches_text("chiyoda"));
        assert!(!entry.matches_text("downtown"));
    }

    #[test]
    fn test_created_at_display_shape() {
        let entry = Entry::new("", "", false).with_created_at(0);
        let shown = entry.created_at_display();
        assert_eq!(shown.len(), "1970-01-01 00:00".len());
    }

    #[test]
    fn test_entry_serialization() {
        let entry = Entry::new("memo", "tag", false)
            .with_created_at(100)
            .with_coordinates(Some(Coordinates::new(1.0, 2.0, 3.0)));

        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("\"address\""));

        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
