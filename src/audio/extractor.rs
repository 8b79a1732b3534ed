use super::track::{TrackMetadata, TrackRecord};
use crate::error::ExtractError;
use id3::TagLike;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed-delay retry for files that may still be mid-copy when a scan runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(300),
        }
    }
}

/// Source of raw tag values for a single file.
pub trait TagReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<TrackMetadata, ExtractError>;
}

/// Reads ID3 frames; duration comes from the stream itself when `probe` is on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Id3TagReader;

impl TagReader for Id3TagReader {
    fn read(&self, path: &Path) -> Result<TrackMetadata, ExtractError> {
        let tag = match id3::Tag::read_from_path(path) {
            Ok(tag) => Some(tag),
            Err(err) if matches!(err.kind, id3::ErrorKind::NoTag) => None,
            Err(err) if err.partial_tag.is_some() => {
                debug!("Using partial ID3 tag for {}: {}", path.display(), err.description);
                err.partial_tag
            }
            Err(err) => return Err(err.into()),
        };

        #[cfg_attr(not(feature = "probe"), allow(unused_mut))]
        let mut metadata = tag.as_ref().map(metadata_from_id3).unwrap_or_default();

        #[cfg(feature = "probe")]
        if let Some(duration) = probe_duration(path)? {
            metadata.duration = Some(duration);
        }

        Ok(metadata)
    }
}

fn metadata_from_id3(tag: &id3::Tag) -> TrackMetadata {
    TrackMetadata {
        title: tag.title().map(str::to_string),
        artist: tag.artist().map(str::to_string),
        album: tag.album().map(str::to_string),
        year: tag
            .year()
            .or_else(|| tag.date_recorded().map(|ts| ts.year)),
        // TLEN is milliseconds
        duration: tag.duration().map(|ms| f64::from(ms) / 1000.0),
    }
}

#[cfg(feature = "probe")]
fn probe_duration(path: &Path) -> Result<Option<f64>, ExtractError> {
    use std::fs::File;
    use symphonia::core::codecs::CODEC_TYPE_NULL;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = match symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => probed,
        Err(err) => {
            debug!("Duration probe failed for {}: {}", path.display(), err);
            return Ok(None);
        }
    };

    let duration = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .and_then(|track| {
            let time_base = track.codec_params.time_base?;
            let n_frames = track.codec_params.n_frames?;
            let time = time_base.calc_time(n_frames);
            Some(time.seconds as f64 + time.frac)
        });

    Ok(duration)
}

/// Turns a path into a `TrackRecord`, always. Failures degrade to the fallback record.
#[derive(Clone)]
pub struct MetadataExtractor {
    reader: Arc<dyn TagReader>,
    retry: RetryPolicy,
}

impl MetadataExtractor {
    pub fn new(retry: RetryPolicy) -> Self {
        Self::with_reader(Arc::new(Id3TagReader), retry)
    }

    pub fn with_reader(reader: Arc<dyn TagReader>, retry: RetryPolicy) -> Self {
        Self { reader, retry }
    }

    pub async fn extract(&self, path: &Path) -> TrackRecord {
        match self.read_with_retry(path).await {
            Ok(metadata) => TrackRecord::from_metadata(path, metadata),
            Err(err) => {
                warn!("Falling back to default tags for {}: {}", path.display(), err);
                TrackRecord::fallback(path)
            }
        }
    }

    async fn read_with_retry(&self, path: &Path) -> Result<TrackMetadata, ExtractError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.read_once(path).await {
                Ok(metadata) => return Ok(metadata),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    debug!(
                        "Attempt {}/{} for {} not ready ({}), retrying in {:?}",
                        attempt,
                        max_attempts,
                        path.display(),
                        err,
                        self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Tag parsing and probing are blocking file reads; keep them off the runtime workers.
    async fn read_once(&self, path: &Path) -> Result<TrackMetadata, ExtractError> {
        let reader = Arc::clone(&self.reader);
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || reader.read(&path))
            .await
            .map_err(|e| ExtractError::Permanent(format!("tag reader task failed: {}", e)))?
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
