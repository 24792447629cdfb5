//! Position sources for the capture form.
//!
//! A [`LocationProvider`] answers one-shot position requests. Two sources
//! exist: coordinates supplied up front ([`FixedLocation`]) and a gpsd
//! daemon reached over TCP ([`GpsdLocation`]).

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::entry::Coordinates;
use crate::error::{Error, Result};

/// gpsd command enabling JSON watch mode.
const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\n";

/// gpsd fix mode for a 2D fix.
const MODE_2D: u8 = 2;
/// gpsd fix mode for a 3D fix.
const MODE_3D: u8 = 3;

/// How far a receiver clock may lag the system clock before its reports
/// count as stale.
const CLOCK_SKEW_MS: i64 = 1_000;

/// Parameters of a one-shot position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    /// Only accept the most precise fix the source can produce.
    pub high_accuracy: bool,
    /// Give up after this long.
    pub timeout: Duration,
    /// Oldest acceptable age of a reported fix.
    pub maximum_age: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(15),
            maximum_age: Duration::ZERO,
        }
    }
}

/// A source of position fixes.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Obtain a fresh position fix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if access to the source is refused
    /// and [`Error::LocationUnavailable`] if no fix arrives in time.
    async fn current_position(&self, request: &LocationRequest) -> Result<Coordinates>;
}

/// Coordinates known in advance, e.g. typed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    coordinates: Coordinates,
}

impl FixedLocation {
    /// Wrap known coordinates.
    #[must_use]
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn current_position(&self, _request: &LocationRequest) -> Result<Coordinates> {
        if self.coordinates.is_valid() {
            Ok(self.coordinates)
        } else {
            Err(Error::location_unavailable(format!(
                "coordinates out of range: {}",
                self.coordinates.lat_lng()
            )))
        }
    }
}

/// Provider used when no location source was chosen.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocationSource;

#[async_trait]
impl LocationProvider for NoLocationSource {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn current_position(&self, _request: &LocationRequest) -> Result<Coordinates> {
        Err(Error::location_unavailable(
            "no location source configured; pass --lat/--lng or --gps",
        ))
    }
}

/// Position fixes from a gpsd daemon.
#[derive(Debug, Clone)]
pub struct GpsdLocation {
    address: String,
}

/// The subset of a gpsd report this crate reads.
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    #[serde(default)]
    mode: u8,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    epx: Option<f64>,
    #[serde(default)]
    epy: Option<f64>,
}

impl GpsdReport {
    /// Coordinates from a TPV report with at least `min_mode`.
    fn fix(&self, min_mode: u8) -> Option<Coordinates> {
        if self.class != "TPV" || self.mode < min_mode {
            return None;
        }
        let (lat, lon) = (self.lat?, self.lon?);
        let accuracy = match (self.epx, self.epy) {
            (Some(x), Some(y)) => x.max(y),
            (Some(e), None) | (None, Some(e)) => e,
            (None, None) => 0.0,
        };
        Some(Coordinates::new(lat, lon, accuracy))
    }

    /// Whether the report is older than `cutoff`. Reports without a
    /// parseable timestamp count as fresh.
    fn is_older_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .is_some_and(|t| t.with_timezone(&Utc) < cutoff)
    }
}

/// Oldest report time accepted for a request made at `now`.
fn freshness_cutoff(now: DateTime<Utc>, maximum_age: Duration) -> DateTime<Utc> {
    let max_age =
        chrono::Duration::from_std(maximum_age).unwrap_or_else(|_| chrono::Duration::zero());
    now - max_age - chrono::Duration::milliseconds(CLOCK_SKEW_MS)
}

impl GpsdLocation {
    /// Provider for the gpsd daemon at `address` (`host:port`).
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// The daemon address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    async fn read_fix(&self, request: &LocationRequest) -> Result<Coordinates> {
        let min_mode = if request.high_accuracy { MODE_3D } else { MODE_2D };
        let cutoff = freshness_cutoff(Utc::now(), request.maximum_age);

        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| self.connect_error(&e))?;
        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(WATCH_COMMAND.as_bytes())
            .await
            .map_err(|e| self.stream_error(&e))?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await.map_err(|e| self.stream_error(&e))? {
            let report: GpsdReport = match serde_json::from_str(&line) {
                Ok(report) => report,
                Err(e) => {
                    trace!("Skipping unparseable gpsd line: {}", e);
                    continue;
                }
            };

            if report.class == "TPV" && report.is_older_than(cutoff) {
                trace!("Skipping stale TPV report");
                continue;
            }
            if let Some(coords) = report.fix(min_mode) {
                debug!("gpsd fix: {}", coords);
                return Ok(coords);
            }
        }

        Err(Error::location_unavailable(format!(
            "gpsd at {} closed the connection without a fix",
            self.address
        )))
    }

    fn connect_error(&self, err: &std::io::Error) -> Error {
        match err.kind() {
            ErrorKind::PermissionDenied => {
                Error::permission_denied(format!("connecting to gpsd at {}: {err}", self.address))
            }
            _ => Error::location_unavailable(format!(
                "cannot reach gpsd at {}: {err}",
                self.address
            )),
        }
    }

    fn stream_error(&self, err: &std::io::Error) -> Error {
        Error::location_unavailable(format!("gpsd at {} failed: {err}", self.address))
    }
}

#[async_trait]
impl LocationProvider for GpsdLocation {
    fn name(&self) -> &'static str {
        "gpsd"
    }

    async fn current_position(&self, request: &LocationRequest) -> Result<Coordinates> {
        debug!(
            "Requesting fix from gpsd at {} (high accuracy: {})",
            self.address, request.high_accuracy
        );
        tokio::time::timeout(request.timeout, self.read_fix(request))
            .await
            .map_err(|_| {
                Error::location_unavailable(format!(
                    "no fix from gpsd within {} ms",
                    request.timeout.as_millis()
                ))
            })?
    }
}
