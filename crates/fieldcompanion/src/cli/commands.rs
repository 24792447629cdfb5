//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::entry::Coordinates;
use crate::view::{EntryQuery, OutputFormat, SortOrder, VisitFilter};

/// Where a position fix comes from.
#[derive(Debug, Clone, Args)]
pub struct LocationArgs {
    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true, requires = "lng", conflicts_with = "gps")]
    pub lat: Option<f64>,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true, requires = "lat", conflicts_with = "gps")]
    pub lng: Option<f64>,

    /// Accuracy radius in meters for --lat/--lng
    #[arg(long, default_value = "0", requires = "lat")]
    pub accuracy: f64,

    /// Ask the gpsd daemon for a fix
    #[arg(long)]
    pub gps: bool,

    /// Reverse geocode the fix to an address
    #[arg(long)]
    pub resolve_address: bool,
}

impl LocationArgs {
    /// Coordinates typed on the command line.
    #[must_use]
    pub fn fixed(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng, self.accuracy)),
            _ => None,
        }
    }

    /// Whether any location source was requested.
    #[must_use]
    pub fn requested(&self) -> bool {
        self.gps || self.fixed().is_some()
    }
}

/// Record command arguments.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Free-text memo
    #[arg(short, long, default_value = "")]
    pub memo: String,

    /// Tags, whitespace separated
    #[arg(short, long, default_value = "")]
    pub tags: String,

    /// Mark the site as visited
    #[arg(long)]
    pub visited: bool,

    /// Image file to attach (repeatable, at most 5 are kept)
    #[arg(short, long = "photo", value_name = "FILE")]
    pub photos: Vec<PathBuf>,

    /// Location source
    #[command(flatten)]
    pub location: LocationArgs,

    /// Refuse to save without at least one usable photo
    #[arg(long)]
    pub require_photo: bool,
}

/// Locate command arguments.
#[derive(Debug, Args)]
pub struct LocateCommand {
    /// Location source
    #[command(flatten)]
    pub location: LocationArgs,

    /// Also print map and zoning links
    #[arg(short, long)]
    pub links: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Text matched against memo, tags and address
    pub query: Option<String>,

    /// Filter by visited flag
    #[arg(short, long, value_enum, default_value = "any")]
    pub filter: VisitFilter,

    /// Sort order
    #[arg(short, long, value_enum, default_value = "newest")]
    pub sort: SortOrder,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

impl ListCommand {
    /// The query these arguments describe.
    #[must_use]
    pub fn to_query(&self) -> EntryQuery {
        EntryQuery::text(self.query.clone().unwrap_or_default())
            .visited(self.filter)
            .sort(self.sort)
            .limit(self.limit)
    }
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Entry id
    pub id: i64,

    /// Output format
    #[arg(long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Links command arguments.
#[derive(Debug, Args)]
pub struct LinksCommand {
    /// Entry whose coordinates to use
    #[arg(required_unless_present = "lat", conflicts_with = "lat")]
    pub id: Option<i64>,

    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    pub lat: Option<f64>,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lng: Option<f64>,

    /// Open the links in the default browser
    #[arg(short, long)]
    pub open: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Settings commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Store the geocoding API key
    SetApiKey {
        /// The key
        key: String,
    },

    /// Show whether an API key is stored
    Show,

    /// Forget the stored API key
    ClearApiKey,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_location_args_fixed() {
        let args = LocationArgs {
            lat: Some(35.0),
            lng: Some(139.0),
            accuracy: 7.4,
            gps: false,
            resolve_address: false,
        };
        let coords = args.fixed().unwrap();
        assert!((coords.accuracy_m - 7.0).abs() < f64::EPSILON);
        assert!(args.requested());
    }

    #[test]
    fn test_location_args_none() {
        let args = LocationArgs {
            lat: None,
            lng: None,
            accuracy: 0.0,
            gps: false,
            resolve_address: true,
        };
        assert!(args.fixed().is_none());
        assert!(!args.requested());
    }

    #[test]
    fn test_list_to_query() {
        let cmd = ListCommand {
            query: Some("riverside".to_string()),
            filter: VisitFilter::Visited,
            sort: SortOrder::Oldest,
            limit: Some(3),
            format: OutputFormat::Table,
        };
        let query = cmd.to_query();
        assert_eq!(query.text, "riverside");
        assert_eq!(query.visited, VisitFilter::Visited);
        assert_eq!(query.sort, SortOrder::Oldest);
        assert_eq!(query.limit, Some(3));
    }
}
