//! `fieldco` - CLI for fieldcompanion
//!
//! This binary records field visits and manages the local entry store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;

use fieldcompanion::backup;
use fieldcompanion::capture::{
    CaptureController, DraftSession, FixedLocation, GpsdLocation, LocationProvider,
    NoLocationSource, SavePolicy,
};
use fieldcompanion::cli::{
    Cli, Command, ConfigCommand, LinksCommand, ListCommand, LocateCommand, LocationArgs,
    RecordCommand, SettingsCommand, ShowCommand,
};
use fieldcompanion::entry::Coordinates;
use fieldcompanion::links::{open_in_browser, LinkTemplates};
use fieldcompanion::view::{render, OutputFormat};
use fieldcompanion::{init_logging, Config, GoogleGeocoder, Storage};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validating a file must not depend on the active configuration loading
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        return handle_validate(file.clone());
    }

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(&config, &config_cmd),
        command => command,
    };

    let db_path = config.database_path();
    let storage = Storage::open(&db_path)
        .with_context(|| format!("opening entry store at {}", db_path.display()))?;

    // Execute the command
    match command {
        Command::Record(cmd) => handle_record(&config, &storage, cmd).await,
        Command::Locate(cmd) => handle_locate(&config, &storage, &cmd).await,
        Command::List(cmd) => handle_list(&storage, &cmd),
        Command::Show(cmd) => handle_show(&config, &storage, &cmd),
        Command::Delete { id } => handle_delete(&storage, id),
        Command::Clear { yes } => handle_clear(&storage, yes),
        Command::Export { output } => {
            let (path, count) = backup::export_to_path(&storage, output.as_deref())?;
            println!("Exported {count} entries to {}", path.display());
            Ok(())
        }
        Command::Import { file } => {
            let count = backup::import_from_path(&storage, &file)
                .with_context(|| format!("importing {}", file.display()))?;
            println!("Imported {count} entries.");
            Ok(())
        }
        Command::Links(cmd) => handle_links(&config, &storage, &cmd),
        Command::Settings(cmd) => handle_settings(&storage, &cmd),
        Command::Status(cmd) => handle_status(&config, &storage, cmd.json),
        Command::Config(_) => Ok(()),
    }
}

fn locator(config: &Config, args: &LocationArgs) -> Box<dyn LocationProvider> {
    if let Some(coords) = args.fixed() {
        Box::new(FixedLocation::new(coords))
    } else if args.gps {
        Box::new(GpsdLocation::new(config.location.gpsd_address.clone()))
    } else {
        Box::new(NoLocationSource)
    }
}

fn geocoder(config: &Config, storage: &Storage) -> anyhow::Result<GoogleGeocoder> {
    Ok(GoogleGeocoder::new(
        config.geocoding.endpoint.clone(),
        config.geocoding.language.clone(),
        storage.api_key()?,
        config.geocoding_timeout(),
    )?)
}

async fn handle_record(
    config: &Config,
    storage: &Storage,
    cmd: RecordCommand,
) -> anyhow::Result<()> {
    let geocoder = geocoder(config, storage)?;
    let locator = locator(config, &cmd.location);
    let policy = SavePolicy {
        require_photo: cmd.require_photo || config.capture.require_photo,
    };
    let controller = CaptureController::new(storage, locator.as_ref(), &geocoder)
        .with_location_request(config.location_request())
        .with_normalizer(config.photo_normalizer())
        .with_policy(policy);

    let mut draft =
        DraftSession::new(cmd.memo, cmd.tags, cmd.visited).with_photo_paths(cmd.photos);

    // Location and address are optional; a failure is reported and the
    // entry is saved without them.
    if cmd.location.requested() {
        match controller.acquire_location(&mut draft).await {
            Ok(coords) => println!("Location: {coords}"),
            Err(e) if e.is_user_recoverable() => eprintln!("warning: {e}"),
            Err(e) => return Err(e.into()),
        }
    }
    if cmd.location.resolve_address {
        match controller.resolve_address(&mut draft).await {
            Ok(address) => println!("Address:  {address}"),
            Err(e) if e.is_user_recoverable() => eprintln!("warning: {e}"),
            Err(e) => return Err(e.into()),
        }
    }

    let id = controller.save(&mut draft).await?;
    println!("Saved entry #{id}");
    Ok(())
}

async fn handle_locate(
    config: &Config,
    storage: &Storage,
    cmd: &LocateCommand,
) -> anyhow::Result<()> {
    if !cmd.location.requested() {
        bail!("choose a location source with --gps or --lat/--lng");
    }

    let geocoder = geocoder(config, storage)?;
    let locator = locator(config, &cmd.location);
    let controller = CaptureController::new(storage, locator.as_ref(), &geocoder)
        .with_location_request(config.location_request());

    let mut draft = DraftSession::default();
    let coords = controller.acquire_location(&mut draft).await?;
    println!("Location: {coords}");

    if cmd.location.resolve_address {
        let address = controller.resolve_address(&mut draft).await?;
        println!("Address:  {address}");
    }
    if cmd.links {
        print_links(&config.link_templates(), &coords);
    }
    Ok(())
}

fn handle_list(storage: &Storage, cmd: &ListCommand) -> anyhow::Result<()> {
    let entries = cmd.to_query().apply(storage.get_all()?);
    print!("{}", render(&entries, cmd.format)?);
    Ok(())
}

fn handle_show(config: &Config, storage: &Storage, cmd: &ShowCommand) -> anyhow::Result<()> {
    let Some(entry) = storage.get(cmd.id)? else {
        bail!("no entry with id {}", cmd.id);
    };

    print!("{}", render(std::slice::from_ref(&entry), cmd.format)?);
    if cmd.format == OutputFormat::Plain {
        if let Some(coords) = &entry.coordinates {
            print_links(&config.link_templates(), coords);
        }
    }
    Ok(())
}

fn handle_delete(storage: &Storage, id: i64) -> anyhow::Result<()> {
    if !storage.delete(id)? {
        bail!("no entry with id {id}");
    }
    println!("Deleted entry #{id}");
    Ok(())
}

fn handle_clear(storage: &Storage, yes: bool) -> anyhow::Result<()> {
    if !yes {
        println!(
            "This will delete all {} entries. Settings are kept.",
            storage.count()?
        );
        println!("Use --yes to confirm.");
        return Ok(());
    }
    let removed = storage.clear()?;
    println!("Deleted {removed} entries.");
    Ok(())
}

fn handle_links(config: &Config, storage: &Storage, cmd: &LinksCommand) -> anyhow::Result<()> {
    let coords = match (cmd.id, cmd.lat, cmd.lng) {
        (Some(id), _, _) => {
            let Some(entry) = storage.get(id)? else {
                bail!("no entry with id {id}");
            };
            let Some(coords) = entry.coordinates else {
                bail!("entry #{id} has no location");
            };
            coords
        }
        (None, Some(lat), Some(lng)) => Coordinates::new(lat, lng, 0.0),
        _ => bail!("give an entry id or --lat and --lng"),
    };

    let templates = config.link_templates();
    print_links(&templates, &coords);
    if cmd.open {
        open_in_browser(&templates.map_url(&coords))?;
        open_in_browser(&templates.zoning_url(&coords))?;
    }
    Ok(())
}

fn print_links(templates: &LinkTemplates, coords: &Coordinates) {
    println!("Map:      {}", templates.map_url(coords));
    println!("Zoning:   {}", templates.zoning_url(coords));
}

fn handle_settings(storage: &Storage, cmd: &SettingsCommand) -> anyhow::Result<()> {
    match cmd {
        SettingsCommand::SetApiKey { key } => {
            if key.trim().is_empty() {
                bail!("the API key must not be empty; use `settings clear-api-key` to remove it");
            }
            storage.set_api_key(key)?;
            println!("API key saved.");
        }
        SettingsCommand::Show => match storage.api_key()? {
            Some(key) => println!("API key: configured ({})", mask(&key)),
            None => println!("API key: not configured"),
        },
        SettingsCommand::ClearApiKey => {
            if storage.clear_api_key()? {
                println!("API key removed.");
            } else {
                println!("No API key was stored.");
            }
        }
    }
    Ok(())
}

/// Show only the last four characters of a secret.
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    let tail: String = secret.chars().skip(count.saturating_sub(4)).collect();
    format!("****{tail}")
}

fn handle_status(config: &Config, storage: &Storage, json: bool) -> anyhow::Result<()> {
    let stats = storage.stats()?;
    let api_key_configured = storage.api_key()?.is_some();

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "db_size_bytes": stats.db_size_bytes,
            "total_entries": stats.total_entries,
            "visited_entries": stats.visited_entries,
            "oldest_created_at": stats.oldest_created_at,
            "newest_created_at": stats.newest_created_at,
            "api_key_configured": api_key_configured,
            "gpsd_address": config.location.gpsd_address,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("fieldco status");
        println!("--------------");
        println!("Database:      {}", storage.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Entries:       {}", stats.total_entries);
        println!("Visited:       {}", stats.visited_entries);
        println!(
            "API key:       {}",
            if api_key_configured {
                "configured"
            } else {
                "not configured"
            }
        );
        println!("gpsd:          {}", config.location.gpsd_address);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Capture]");
                println!("  Require photo:      {}", config.capture.require_photo);
                println!();
                println!("[Location]");
                println!("  gpsd address:       {}", config.location.gpsd_address);
                println!("  Timeout (ms):       {}", config.location.timeout_ms);
                println!("  High accuracy:      {}", config.location.high_accuracy);
                println!();
                println!("[Photos]");
                println!("  Max edge (px):      {}", config.photos.max_edge);
                println!("  JPEG quality:       {}", config.photos.jpeg_quality);
                println!("  Max photos:         {}", config.photos.max_photos);
                println!();
                println!("[Geocoding]");
                println!("  Endpoint:           {}", config.geocoding.endpoint);
                println!("  Language:           {}", config.geocoding.language);
                println!("  Timeout (s):        {}", config.geocoding.timeout_secs);
                println!();
                println!("[Links]");
                println!("  Map:                {}", config.links.map_url);
                println!("  Zoning:             {}", config.links.zoning_url);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => return handle_validate(file.clone()),
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    Config::load_from(Some(path.clone()))
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    println!("Configuration is valid.");
    Ok(())
}
