pub mod extractor;
pub mod playback;
pub mod player;
pub mod scanner;
pub mod track;

pub use extractor::{Id3TagReader, MetadataExtractor, RetryPolicy, TagReader};
pub use playback::{PlaybackController, PlaybackState};
pub use player::AudioOutput;
#[cfg(feature = "audio")]
pub use player::RodioOutput;
pub use scanner::{MusicScanner, ScanProgress};
pub use track::{TrackMetadata, TrackRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    pub volume: f32, // 0.0 to 1.0
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { volume: 0.7 }
    }
}

impl From<&crate::config::Config> for AudioConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            volume: config.audio.volume.clamp(0.0, 1.0),
        }
    }
}

impl From<&crate::config::Config> for RetryPolicy {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            max_attempts: config.extractor.max_attempts.max(1),
            delay: std::time::Duration::from_millis(config.extractor.retry_delay_ms),
        }
    }
}
