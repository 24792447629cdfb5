//! Command-line interface for fieldcompanion.
//!
//! This module provides the CLI structure for the `fieldco` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, LinksCommand, ListCommand, LocateCommand, LocationArgs, RecordCommand,
    SettingsCommand, ShowCommand, StatusCommand,
};

/// fieldco - Record field visits from the command line
///
/// Capture a site with photos, memo, tags, a position fix and a resolved
/// address; list, search, back up and restore what you recorded.
#[derive(Debug, Parser)]
#[command(name = "fieldco")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a new entry
    Record(RecordCommand),

    /// Acquire a position fix without saving anything
    Locate(LocateCommand),

    /// List and search entries
    List(ListCommand),

    /// Show one entry
    Show(ShowCommand),

    /// Delete one entry
    Delete {
        /// Entry id
        id: i64,
    },

    /// Delete every entry
    Clear {
        /// Confirm deletion
        #[arg(short, long)]
        yes: bool,
    },

    /// Write all entries to a JSON backup
    Export {
        /// Output file (default: field-companion-backup-<ms>.json)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Add the entries of a JSON backup
    Import {
        /// Backup file
        file: PathBuf,
    },

    /// Print map and zoning links for a location
    Links(LinksCommand),

    /// Manage stored settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Show store status
    Status(StatusCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{OutputFormat, SortOrder, VisitFilter};
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "fieldco");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        use crate::logging::Verbosity;

        assert_eq!(parse(&["fieldco", "-q", "status"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["fieldco", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["fieldco", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["fieldco", "-vv", "status"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_record() {
        let cli = parse(&[
            "fieldco", "record", "--memo", "vacant lot", "--tags", "corner", "--visited",
            "--photo", "a.jpg", "--photo", "b.png", "--lat", "35.5", "--lng", "-120.25",
            "--resolve-address",
        ]);
        let Command::Record(cmd) = cli.command else {
            panic!("expected record");
        };
        assert_eq!(cmd.memo, "vacant lot");
        assert!(cmd.visited);
        assert_eq!(cmd.photos.len(), 2);
        assert!(cmd.location.resolve_address);
        let coords = cmd.location.fixed().unwrap();
        assert!((coords.longitude + 120.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lat_requires_lng() {
        assert!(Cli::try_parse_from(["fieldco", "record", "--lat", "35.0"]).is_err());
    }

    #[test]
    fn test_gps_conflicts_with_fixed() {
        assert!(Cli::try_parse_from([
            "fieldco", "locate", "--gps", "--lat", "1", "--lng", "2"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_list() {
        let cli = parse(&[
            "fieldco", "list", "riverside", "--filter", "unvisited", "--sort", "visited",
            "--format", "json",
        ]);
        let Command::List(cmd) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(cmd.query.as_deref(), Some("riverside"));
        assert_eq!(cmd.filter, VisitFilter::Unvisited);
        assert_eq!(cmd.sort, SortOrder::VisitedFirst);
        assert_eq!(cmd.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_links() {
        let cli = parse(&["fieldco", "links", "7", "--open"]);
        assert!(matches!(
            cli.command,
            Command::Links(LinksCommand { id: Some(7), open: true, .. })
        ));

        let cli = parse(&["fieldco", "links", "--lat", "1.5", "--lng", "2.5"]);
        assert!(matches!(cli.command, Command::Links(LinksCommand { id: None, .. })));

        assert!(Cli::try_parse_from(["fieldco", "links"]).is_err());
    }

    #[test]
    fn test_parse_settings() {
        let cli = parse(&["fieldco", "settings", "set-api-key", "abc"]);
        assert!(matches!(
            cli.command,
            Command::Settings(SettingsCommand::SetApiKey { ref key }) if key == "abc"
        ));
    }

    #[test]
    fn test_parse_clear_and_import() {
        assert!(matches!(
            parse(&["fieldco", "clear", "--yes"]).command,
            Command::Clear { yes: true }
        ));
        assert!(matches!(
            parse(&["fieldco", "import", "backup.json"]).command,
            Command::Import { .. }
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["fieldco", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
