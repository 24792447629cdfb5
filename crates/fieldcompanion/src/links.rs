//! External map and zoning links.
//!
//! Links are fixed URL templates with `{lat}` and `{lng}` placeholders.
//! Opening one is fire-and-forget: the platform opener is spawned and never
//! waited on.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::entry::Coordinates;
use crate::error::Result;

/// Latitude placeholder in link templates.
pub const LAT_PLACEHOLDER: &str = "{lat}";
/// Longitude placeholder in link templates.
pub const LNG_PLACEHOLDER: &str = "{lng}";

/// URL templates for the external viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplates {
    /// Map viewer template.
    pub map_url: String,
    /// Zoning viewer template.
    pub zoning_url: String,
}

impl Default for LinkTemplates {
    fn default() -> Self {
        Self {
            map_url: "https://www.google.com/maps/search/?api=1&query={lat},{lng}".to_string(),
            zoning_url: "https://www.reinfolib.mlit.go.jp/map/?lat={lat}&lng={lng}&zoom=16"
                .to_string(),
        }
    }
}

impl LinkTemplates {
    /// Map viewer URL for `coords`.
    #[must_use]
    pub fn map_url(&self, coords: &Coordinates) -> String {
        fill(&self.map_url, coords)
    }

    /// Zoning viewer URL for `coords`.
    #[must_use]
    pub fn zoning_url(&self, coords: &Coordinates) -> String {
        fill(&self.zoning_url, coords)
    }
}

fn fill(template: &str, coords: &Coordinates) -> String {
    template
        .replace(LAT_PLACEHOLDER, &format!("{:.6}", coords.latitude))
        .replace(LNG_PLACEHOLDER, &format!("{:.6}", coords.longitude))
}

/// Hand `url` to the platform opener without waiting for it.
///
/// # Errors
///
/// Returns an error if the opener cannot be spawned.
pub fn open_in_browser(url: &str) -> Result<()> {
    let mut command = opener_command(url);
    debug!("Opening {} with {:?}", url, command.get_program());
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}
