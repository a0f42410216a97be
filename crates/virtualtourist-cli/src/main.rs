//! VirtualTourist - drop pins on the map and keep a random album of nearby
//! Flickr photos for each, cached locally for offline browsing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use virtualtourist_core::map::{to_geojson, MapMarker};
use virtualtourist_core::{
    AlbumSlot, CameraPosition, Config, EnsureOutcome, FlickrClient, PhotoFetcher, PinStore,
};

// ============================================================================
// Constants
// ============================================================================

/// Log file written inside the data directory
const LOG_FILE: &str = "virtualtourist.log";

const USAGE: &str = "\
Usage: virtualtourist <command>

Commands:
  pins                                   List pins
  add <lat> <lon>                        Drop a pin and fetch its album
  album <pin>                            Show a pin's album, fetching it if empty
  new-collection <pin>                   Replace a pin's album with a fresh batch
  delete-photo <photo>                   Remove one photo from its album
  delete-pin <pin>                       Remove a pin and its photos
  export <pin> <dir>                     Write a pin's photos to a directory
  map                                    Print pins as GeoJSON
  camera [<lat> <lon> <dist> <heading> <pitch>]
                                         Show or save the last map camera";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Pins,
    Add { latitude: f64, longitude: f64 },
    Album(Uuid),
    NewCollection(Uuid),
    DeletePhoto(Uuid),
    DeletePin(Uuid),
    Export { pin_id: Uuid, dir: PathBuf },
    Map,
    Camera(Option<CameraPosition>),
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            [] | ["help"] | ["--help"] | ["-h"] => Command::Help,
            ["pins"] => Command::Pins,
            ["add", lat, lon] => Command::Add {
                latitude: parse_number(lat, "latitude")?,
                longitude: parse_number(lon, "longitude")?,
            },
            ["album", pin] => Command::Album(parse_id(pin)?),
            ["new-collection", pin] => Command::NewCollection(parse_id(pin)?),
            ["delete-photo", photo] => Command::DeletePhoto(parse_id(photo)?),
            ["delete-pin", pin] => Command::DeletePin(parse_id(pin)?),
            ["export", pin, dir] => Command::Export {
                pin_id: parse_id(pin)?,
                dir: PathBuf::from(*dir),
            },
            ["map"] => Command::Map,
            ["camera"] => Command::Camera(None),
            ["camera", lat, lon, distance, heading, pitch] => Command::Camera(Some(CameraPosition {
                latitude: parse_number(lat, "latitude")?,
                longitude: parse_number(lon, "longitude")?,
                distance: parse_number(distance, "distance")?,
                heading: parse_number(heading, "heading")?,
                pitch: parse_number(pitch, "pitch")?,
            })),
            _ => anyhow::bail!("Unrecognized command: {}\n\n{}", args.join(" "), USAGE),
        };
        Ok(command)
    }

    /// Commands that may reach the photo search API
    fn needs_network(&self) -> bool {
        matches!(
            self,
            Command::Add { .. } | Command::Album(_) | Command::NewCollection(_)
        )
    }
}

fn parse_number(value: &str, name: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .with_context(|| format!("Invalid {}: {}", name, value))
}

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid id: {}", value))
}

/// Initialize the tracing subscriber, logging to a file in `log_dir`
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load()?;
    let data_dir = config.data_dir()?;
    let _log_guard = init_tracing(&data_dir)?;
    info!(?command, "VirtualTourist starting");

    if let Command::Camera(camera) = &command {
        return run_camera(&mut config, *camera);
    }

    // Only commands that fetch need a real key
    let api_key = if command.needs_network() {
        config.api_key()?
    } else {
        config.api_key().unwrap_or_default()
    };
    let client = FlickrClient::with_timeout(api_key, config.request_timeout())?;
    let store = Arc::new(PinStore::open(data_dir, PhotoFetcher::new(Arc::new(client)))?);

    let result = run(&store, command).await;
    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}

async fn run(store: &PinStore, command: Command) -> Result<()> {
    match command {
        Command::Pins => {
            let pins = store.pins().await;
            if pins.is_empty() {
                println!("No pins yet. Drop one with: virtualtourist add <lat> <lon>");
            }
            for pin in pins {
                let count = store.photos(pin.id).await?.len();
                println!(
                    "{}  {}  {} photos  {}",
                    pin.id,
                    pin.coordinate_display(),
                    count,
                    pin.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Add {
            latitude,
            longitude,
        } => {
            let pin = store.add_pin(latitude, longitude).await?;
            println!("Dropped pin {} at {}", pin.id, pin.coordinate_display());
            fetch_album(store, pin.id).await?;
        }
        Command::Album(pin_id) => {
            fetch_album(store, pin_id).await?;
        }
        Command::NewCollection(pin_id) => {
            let count = store.replace_photos(pin_id).await?;
            println!("Fetched a new collection of {} photos", count);
            print_album(store, pin_id).await?;
        }
        Command::DeletePhoto(photo_id) => {
            store.delete_photo(photo_id).await?;
            println!("Deleted photo {}", photo_id);
        }
        Command::DeletePin(pin_id) => {
            let removed = store.delete_pin(pin_id).await?;
            println!("Deleted pin {} and {} photos", pin_id, removed);
        }
        Command::Export { pin_id, dir } => {
            let photos = store.photos(pin_id).await?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            for photo in &photos {
                let path = dir.join(format!("{}.{}", photo.id, photo.file_extension()));
                std::fs::write(&path, &photo.image)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            println!("Exported {} photos to {}", photos.len(), dir.display());
        }
        Command::Map => {
            let markers: Vec<MapMarker> = store.pins().await.iter().map(MapMarker::from).collect();
            println!("{}", serde_json::to_string_pretty(&to_geojson(&markers))?);
        }
        Command::Camera(_) | Command::Help => {}
    }
    Ok(())
}

async fn fetch_album(store: &PinStore, pin_id: Uuid) -> Result<()> {
    match store.ensure_photos(pin_id).await? {
        EnsureOutcome::Cached(count) => println!("Album has {} cached photos", count),
        EnsureOutcome::Fetched(count) => println!("Fetched {} photos", count),
    }
    print_album(store, pin_id).await
}

async fn print_album(store: &PinStore, pin_id: Uuid) -> Result<()> {
    for (i, slot) in store.album(pin_id).await?.iter().enumerate() {
        match slot {
            AlbumSlot::Placeholder => println!("{:>3}  (loading)", i + 1),
            AlbumSlot::Photo(photo) => {
                let note = if virtualtourist_core::fetch::is_placeholder(&photo.image) {
                    "  (unavailable)"
                } else {
                    ""
                };
                println!("{:>3}  {}  {}{}", i + 1, photo.id, photo.size_display(), note);
            }
        }
    }
    Ok(())
}

fn run_camera(config: &mut Config, camera: Option<CameraPosition>) -> Result<()> {
    match camera {
        Some(camera) => {
            config.last_camera = Some(camera);
            config.save()?;
            println!("Saved camera position");
        }
        None => match config.last_camera {
            Some(c) => println!(
                "{:.5}, {:.5}  distance {:.0}m  heading {:.1}  pitch {:.1}",
                c.latitude, c.longitude, c.distance, c.heading, c.pitch
            ),
            None => println!("No saved camera position"),
        },
    }
    Ok(())
}
