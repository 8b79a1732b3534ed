//! Directory watcher for the library folder
//!
//! Raw filesystem events are collapsed into a single `LibraryChanged` signal
//! once the folder has been quiet for the debounce window. A multi-file copy
//! produces one rescan, not one per write.

use crate::error::LibraryError;
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Advisory: the last entry touched in the burst. Consumers rescan regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryChanged {
    pub file_name: String,
}

pub struct LibraryWatcher {
    // The OS watcher stops when this is dropped
    _watcher: RecommendedWatcher,
    debounce_task: JoinHandle<()>,
    dir: PathBuf,
}

impl LibraryWatcher {
    /// Starts watching `dir`. Must be called from inside a tokio runtime.
    pub fn start(
        dir: &Path,
        debounce: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LibraryChanged>), LibraryError> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<String>();
        let (changed_tx, changed_rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => {
                if !changes_library(&event.kind) {
                    return;
                }
                let file_name = event
                    .paths
                    .last()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let _ = raw_tx.send(file_name);
            }
            Err(e) => warn!("Watcher error: {}", e),
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        let debounce_task = spawn_debouncer(raw_rx, debounce, changed_tx);
        info!("Watching {} for changes", dir.display());

        Ok((
            Self {
                _watcher: watcher,
                debounce_task,
                dir: dir.to_path_buf(),
            },
            changed_rx,
        ))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for LibraryWatcher {
    fn drop(&mut self) {
        self.debounce_task.abort();
    }
}

/// Reads (including our own scans) are not changes; a finished write is.
fn changes_library(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}

/// Emits one signal per burst: every event restarts the quiet-period timer.
pub fn spawn_debouncer(
    mut raw_rx: mpsc::UnboundedReceiver<String>,
    window: Duration,
    changed_tx: mpsc::UnboundedSender<LibraryChanged>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(mut last) = raw_rx.recv().await {
            let mut collapsed = 1usize;

            let closed = loop {
                match tokio::time::timeout(window, raw_rx.recv()).await {
                    Ok(Some(file_name)) => {
                        last = file_name;
                        collapsed += 1;
                    }
                    Ok(None) => break true,
                    Err(_) => break false,
                }
            };

            debug!("Library changed ({} events, last: {:?})", collapsed, last);
            if changed_tx.send(LibraryChanged { file_name: last }).is_err() || closed {
                return;
            }
        }
    })
}
