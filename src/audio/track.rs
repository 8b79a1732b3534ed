use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use url::Url;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// One library entry. Identity is `file_name`; the library directory is flat.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    pub file_path: PathBuf,
    pub file_name: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub duration: f64, // seconds
}

/// Tag values as read from the file, before any defaults are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub duration: Option<f64>,
}

impl TrackRecord {
    /// The record used when nothing could be read from the file.
    pub fn fallback(path: &Path) -> Self {
        Self::from_metadata(path, TrackMetadata::default())
    }

    pub fn from_metadata(path: &Path, metadata: TrackMetadata) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            title: non_blank(metadata.title).unwrap_or_else(|| file_stem(path)),
            artist: non_blank(metadata.artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: non_blank(metadata.album).unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            year: metadata.year.map(|y| y.to_string()).unwrap_or_default(),
            duration: metadata
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(0.0),
            file_path: path.to_path_buf(),
            file_name,
        }
    }

    /// `file://` form of the path, for hosts that load sources by URL.
    pub fn file_uri(&self) -> String {
        Url::from_file_path(&self.file_path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file://{}", self.file_path.display()))
    }

    pub fn display_line(&self) -> String {
        let year = if self.year.is_empty() { "Unknown Year" } else { &self.year };
        format!(
            "{} - {} • {} • {} • {}",
            self.title,
            self.artist,
            self.album,
            format_duration(self.duration),
            year
        )
    }
}

// The host-facing JSON shape keeps the original camelCase field names and the URI form of the path.
impl Serialize for TrackRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TrackRecord", 7)?;
        state.serialize_field("filePath", &self.file_uri())?;
        state.serialize_field("fileName", &self.file_name)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("artist", &self.artist)?;
        state.serialize_field("album", &self.album)?;
        state.serialize_field("year", &self.year)?;
        state.serialize_field("duration", &self.duration)?;
        state.end()
    }
}

pub fn format_duration(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "Unknown".to_string();
    }
    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
