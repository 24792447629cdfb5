//! Text rendering of entry listings.

use std::fmt::Write as _;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::Result;

const NO_ADDRESS: &str = "(no address)";
const MEMO_COLUMN_WIDTH: usize = 32;

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One block per entry
    #[default]
    Plain,
    /// Fixed-width table, one row per entry
    Table,
    /// JSON array of full entries
    Json,
}

/// Render `entries` in the given format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(entries: &[Entry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Plain => Ok(render_plain(entries)),
        OutputFormat::Table => Ok(render_table(entries)),
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(entries)?)),
    }
}

fn render_plain(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return "No entries.\n".to_string();
    }

    let mut out = String::new();
    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }

        let id = entry.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        let _ = write!(out, "#{id}  {}", entry.created_at_display());
        if entry.visited {
            out.push_str("  [visited]");
        }
        out.push('\n');

        if !entry.memo.trim().is_empty() {
            let _ = writeln!(out, "  {}", entry.memo.trim());
        }
        let labels = entry.tag_labels();
        if !labels.is_empty() {
            let _ = writeln!(out, "  {}", labels.join(" "));
        }
        if let Some(coords) = &entry.coordinates {
            let _ = writeln!(out, "  {coords}");
        }
        let _ = writeln!(out, "  {}", entry.address.as_deref().unwrap_or(NO_ADDRESS));
        if !entry.photos.is_empty() {
            let _ = writeln!(out, "  photos: {}", entry.photos.len());
        }
    }
    out
}

fn render_table(entries: &[Entry]) -> String {
    let mut out = format!(
        "{:>6}  {:<16}  {:<3}  {:<23}  {:>6}  {}\n",
        "ID", "CREATED", "VIS", "LOCATION", "PHOTOS", "MEMO"
    );
    for entry in entries {
        let id = entry.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        let location = entry
            .coordinates
            .map_or_else(|| "-".to_string(), |c| c.lat_lng());
        let _ = writeln!(
            out,
            "{:>6}  {:<16}  {:<3}  {:<23}  {:>6}  {}",
            id,
            entry.created_at_display(),
            if entry.visited { "yes" } else { "no" },
            location,
            entry.photos.len(),
            truncate(entry.memo.trim(), MEMO_COLUMN_WIDTH),
        );
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
