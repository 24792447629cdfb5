//! Listing entries: filtering, sorting and rendering.
//!
//! Queries are pure functions over a full snapshot of the store. Callers
//! fetch a fresh snapshot for every listing; nothing is cached or updated
//! incrementally.

mod render;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::entry::Entry;

pub use render::{render, OutputFormat};

/// Which entries to keep by visited flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VisitFilter {
    /// Keep every entry
    #[default]
    Any,
    /// Only visited entries
    Visited,
    /// Only entries not yet visited
    Unvisited,
}

impl VisitFilter {
    fn keeps(self, entry: &Entry) -> bool {
        match self {
            Self::Any => true,
            Self::Visited => entry.visited,
            Self::Unvisited => !entry.visited,
        }
    }
}

/// Ordering of listed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    Newest,
    /// Oldest first
    Oldest,
    /// Visited entries before unvisited ones
    #[value(name = "visited")]
    VisitedFirst,
}

/// A listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// Case-insensitive substring matched against memo, tags and address.
    pub text: String,
    /// Visited-flag filter.
    pub visited: VisitFilter,
    /// Sort order.
    pub sort: SortOrder,
    /// Keep at most this many entries after sorting.
    pub limit: Option<usize>,
}

impl EntryQuery {
    /// Query matching `text` with default filter and order.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Set the visited filter.
    #[must_use]
    pub fn visited(mut self, visited: VisitFilter) -> Self {
        self.visited = visited;
        self
    }

    /// Set the sort order.
    #[must_use]
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Set the result limit.
    #[must_use]
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Filter and sort a snapshot.
    ///
    /// Sorting is stable, so entries with equal keys keep their snapshot order.
    #[must_use]
    pub fn apply(&self, entries: Vec<Entry>) -> Vec<Entry> {
        let needle = self.text.trim().to_lowercase();

        let mut selected: Vec<Entry> = entries
            .into_iter()
            .filter(|entry| self.visited.keeps(entry))
            .filter(|entry| needle.is_empty() || entry.matches_text(&needle))
            .collect();

        match self.sort {
            SortOrder::Newest => selected.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Oldest => selected.sort_by_key(|entry| entry.created_at),
            SortOrder::VisitedFirst => selected.sort_by_key(|entry| !entry.visited),
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}
