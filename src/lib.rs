// Lyrebird - music library core for a local folder player
// Scanning, ingest and watching live in library; playback and resume in audio/resume

pub mod audio;    // tags, scanning, playback
pub mod config;   // settings and paths
pub mod error;    // error types per concern
pub mod library;  // the music folder itself
pub mod logging;  // tracing setup
pub mod resume;   // where we left off

#[cfg(feature = "tui")]
pub mod ui;       // terminal front end

pub use audio::{MusicScanner, PlaybackController, TrackMetadata, TrackRecord};
pub use config::Config;
pub use library::{Library, LibraryChanged, LibraryWatcher};
pub use resume::{JsonResumeStore, ResumeState, ResumeStore};
