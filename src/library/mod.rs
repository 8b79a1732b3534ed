// Library - the music folder and everything that changes it
// Scans, ingests and removals are queued behind one lock so they never interleave

pub mod ingest;
pub mod watcher;

pub use watcher::{LibraryChanged, LibraryWatcher};

use crate::audio::{MetadataExtractor, MusicScanner, RetryPolicy, ScanProgress, TrackRecord};
use crate::config::Config;
use crate::error::LibraryError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

pub struct Library {
    dir: PathBuf,
    scanner: MusicScanner,
    op_lock: Mutex<()>,
}

impl Library {
    pub fn new(dir: PathBuf, scanner: MusicScanner) -> Self {
        Self {
            dir,
            scanner,
            op_lock: Mutex::new(()),
        }
    }

    /// Resolves (and creates, on first run) the configured library directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let dir = config.ensure_library_dir()?;
        let extractor = MetadataExtractor::new(RetryPolicy::from(config));
        let scanner = MusicScanner::new(&config.library.extension, extractor);
        Ok(Self::new(dir, scanner))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scanner(&self) -> &MusicScanner {
        &self.scanner
    }

    /// Rebuilds the whole listing from disk.
    pub async fn scan(&self) -> Vec<TrackRecord> {
        let _guard = self.op_lock.lock().await;
        self.scanner.scan_directory(&self.dir).await
    }

    pub async fn scan_incremental(&self, progress_tx: mpsc::Sender<ScanProgress>) -> Vec<TrackRecord> {
        let _guard = self.op_lock.lock().await;
        self.scanner.scan_directory_incremental(&self.dir, progress_tx).await
    }

    /// Copies `sources` in; returns the file names that were copied.
    pub async fn ingest(&self, sources: &[PathBuf]) -> Vec<String> {
        let _guard = self.op_lock.lock().await;
        debug!("Ingesting {} file(s) into {}", sources.len(), self.dir.display());
        ingest::ingest_files(&self.dir, sources, |p| self.scanner.is_supported_file(p)).await
    }

    /// Deletes one library file by name; `false` if there was nothing to delete.
    pub async fn remove(&self, file_name: &str) -> bool {
        let _guard = self.op_lock.lock().await;
        ingest::remove_file(&self.dir, file_name).await
    }

    pub fn watch(
        &self,
        debounce: Duration,
    ) -> Result<(LibraryWatcher, mpsc::UnboundedReceiver<LibraryChanged>), LibraryError> {
        LibraryWatcher::start(&self.dir, debounce)
    }
}
