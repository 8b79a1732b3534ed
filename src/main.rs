// Lyrebird - local music library player
// Subcommands wrap the library operations; `play` is the interactive front end

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lyrebird::audio::track::format_duration;
use lyrebird::{Config, Library, LibraryChanged};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(name = "lyrebird", version, about = "Local music library player")]
struct Args {
    /// Mirror logs to stderr
    #[arg(long)]
    dev: bool,

    /// Use this music folder instead of the configured one
    #[arg(long, value_name = "DIR")]
    library: Option<PathBuf>,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List every track in the library
    Scan {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy files into the library
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Delete a file from the library by name
    Remove { name: String },
    /// Print a line whenever the library folder changes
    Watch,
    /// Interactive player (default)
    Play,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = args.library {
        config.library.dir = Some(dir);
    }

    // Held until exit so buffered log lines get flushed
    let _log_guard = lyrebird::logging::init_logging(&config.state.log_dir, args.dev)?;

    let library = Library::from_config(&config)?;
    info!("Library at {}", library.dir().display());

    match args.command.unwrap_or(Command::Play) {
        Command::Scan { json } => scan(&library, json).await,
        Command::Ingest { paths } => {
            let copied = library.ingest(&paths).await;
            for name in &copied {
                println!("{}", name);
            }
            println!("Ingested {} of {} file(s)", copied.len(), paths.len());
            Ok(())
        }
        Command::Remove { name } => {
            if library.remove(&name).await {
                println!("Removed {}", name);
                Ok(())
            } else {
                anyhow::bail!("{} is not in the library", name)
            }
        }
        Command::Watch => watch(&library, &config).await,
        Command::Play => play(&config, &library).await,
    }
}

async fn scan(library: &Library, json: bool) -> Result<()> {
    let tracks = library.scan().await;

    if json {
        let out = serde_json::to_string_pretty(&tracks).context("serializing listing")?;
        println!("{}", out);
        return Ok(());
    }

    for (i, track) in tracks.iter().enumerate() {
        println!("{:>3}. {}", i + 1, track.display_line());
    }
    let total: f64 = tracks.iter().map(|t| t.duration).sum();
    println!("{} track(s), {}", tracks.len(), format_duration(total));
    Ok(())
}

async fn watch(library: &Library, config: &Config) -> Result<()> {
    let (_watcher, changes) =
        library.watch(Duration::from_millis(config.watcher.debounce_ms))?;
    println!("Watching {} (Ctrl-C to stop)", library.dir().display());

    let rescans = report_changes(library, changes, tokio::signal::ctrl_c()).await;
    info!("Stopped watching after {} rescan(s)", rescans);
    Ok(())
}

/// Rescans on every change signal until `shutdown` resolves or the watcher goes away.
/// A shutdown that arrives mid-scan abandons the scan.
async fn report_changes<F: Future>(
    library: &Library,
    mut changes: mpsc::UnboundedReceiver<LibraryChanged>,
    shutdown: F,
) -> usize {
    tokio::pin!(shutdown);
    let mut rescans = 0;

    loop {
        tokio::select! {
            changed = changes.recv() => {
                let Some(changed) = changed else { break };
                tokio::select! {
                    tracks = library.scan() => {
                        rescans += 1;
                        println!("Changed ({}), {} track(s)", changed.file_name, tracks.len());
                    }
                    _ = &mut shutdown => break,
                }
            }
            _ = &mut shutdown => break,
        }
    }
    rescans
}

#[cfg(all(feature = "tui", feature = "audio"))]
async fn play(config: &Config, library: &Library) -> Result<()> {
    lyrebird::ui::run_player(config, library).await
}

#[cfg(not(all(feature = "tui", feature = "audio")))]
async fn play(_config: &Config, _library: &Library) -> Result<()> {
    anyhow::bail!("built without the `tui` and `audio` features; `play` is unavailable")
}
