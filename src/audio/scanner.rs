use super::extractor::MetadataExtractor;
use super::track::TrackRecord;
use crate::error::LibraryError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

#[derive(Clone)]
pub struct MusicScanner {
    extension: String,
    extractor: MetadataExtractor,
}

#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started { path: PathBuf, total_files: usize },
    TrackFound { track: TrackRecord, progress: usize, total: usize },
    Completed { total_tracks: usize },
    Error { path: PathBuf, error: String },
}

impl MusicScanner {
    pub fn new(extension: &str, extractor: MetadataExtractor) -> Self {
        Self {
            extension: extension.trim().trim_start_matches('.').to_ascii_lowercase(),
            extractor,
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Lists `dir` and extracts every matching file, one after another.
    ///
    /// Never fails: an unreadable directory is logged and yields an empty library.
    pub async fn scan_directory(&self, dir: &Path) -> Vec<TrackRecord> {
        self.scan(dir, None).await
    }

    /// Same as [`scan_directory`](Self::scan_directory), reporting each step over `progress_tx`
    /// so a UI can fill in as tracks arrive.
    pub async fn scan_directory_incremental(
        &self,
        dir: &Path,
        progress_tx: mpsc::Sender<ScanProgress>,
    ) -> Vec<TrackRecord> {
        self.scan(dir, Some(&progress_tx)).await
    }

    pub fn is_supported_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    async fn scan(&self, dir: &Path, progress_tx: Option<&mpsc::Sender<ScanProgress>>) -> Vec<TrackRecord> {
        let candidates = match self.list_candidates(dir) {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("{}", e);
                report(
                    progress_tx,
                    ScanProgress::Error {
                        path: dir.to_path_buf(),
                        error: e.to_string(),
                    },
                )
                .await;
                return Vec::new();
            }
        };

        let total = candidates.len();
        report(
            progress_tx,
            ScanProgress::Started {
                path: dir.to_path_buf(),
                total_files: total,
            },
        )
        .await;

        // Sequential on purpose: one open file and one retry loop at a time.
        let mut tracks = Vec::with_capacity(total);
        for (i, path) in candidates.iter().enumerate() {
            let track = self.extractor.extract(path).await;
            debug!("Scanned {} ({}/{})", track.file_name, i + 1, total);
            if progress_tx.is_some() {
                report(
                    progress_tx,
                    ScanProgress::TrackFound {
                        track: track.clone(),
                        progress: i + 1,
                        total,
                    },
                )
                .await;
            }
            tracks.push(track);
        }

        info!("Scanned {} tracks from {}", tracks.len(), dir.display());
        report(progress_tx, ScanProgress::Completed { total_tracks: tracks.len() }).await;
        tracks
    }

    /// Top-level entries only, in the order the filesystem hands them out.
    fn list_candidates(&self, dir: &Path) -> Result<Vec<PathBuf>, LibraryError> {
        let unavailable = |source| LibraryError::DirectoryUnavailable {
            path: dir.to_path_buf(),
            source,
        };
        // walkdir yields nothing, not an error, for a plain file at the root
        let metadata = std::fs::metadata(dir).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(unavailable(io::Error::new(io::ErrorKind::NotADirectory, "not a directory")));
        }

        let mut candidates = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.is_supported_file(entry.path()) {
                        candidates.push(entry.into_path());
                    }
                }
                Err(e) if e.depth() == 0 => {
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                    return Err(unavailable(source));
                }
                Err(e) => warn!("Skipping unreadable library entry: {}", e),
            }
        }

        Ok(candidates)
    }
}

async fn report(progress_tx: Option<&mpsc::Sender<ScanProgress>>, event: ScanProgress) {
    if let Some(tx) = progress_tx {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    fn scanner() -> MusicScanner {
        MusicScanner::new("mp3", MetadataExtractor::default())
    }

    #[test]
    fn is_supported_file_matches_case_insensitive() {
        let scanner = MusicScanner::new(".MP3", MetadataExtractor::default());
        assert!(scanner.is_supported_file(Path::new("/tmp/a.mp3")));
        assert!(scanner.is_supported_file(Path::new("/tmp/a.Mp3")));
        assert!(!scanner.is_supported_file(Path::new("/tmp/a.flac")));
        assert!(!scanner.is_supported_file(Path::new("/tmp/mp3")));
    }

    #[tokio::test]
    async fn one_record_per_matching_file_regardless_of_tags() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.MP3"), b"not a real mp3").unwrap();
        fs::write(dir.path().join("a.mp3"), b"also not real").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"ignore me").unwrap();
        fs::create_dir(dir.path().join("nested.mp3")).unwrap();
        fs::write(dir.path().join("nested.mp3").join("deep.mp3"), b"too deep").unwrap();

        let tracks = scanner().scan_directory(dir.path()).await;

        assert_eq!(tracks.len(), 2);
        let names: HashSet<_> = tracks.iter().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names, HashSet::from(["a.mp3", "b.MP3"]));
        for track in &tracks {
            assert_eq!(track.artist, "Unknown Artist");
            assert_eq!(track.album, "Unknown Album");
            assert_eq!(track.year, "");
            assert_eq!(track.duration, 0.0);
        }
        let b = tracks.iter().find(|t| t.file_name == "b.MP3").unwrap();
        assert_eq!(b.title, "b");
    }

    #[tokio::test]
    async fn missing_directory_yields_empty_library() {
        let dir = tempdir().unwrap();
        let tracks = scanner().scan_directory(&dir.path().join("nope")).await;
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn incremental_scan_reports_directory_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let (tx, mut rx) = mpsc::channel(16);

        let tracks = scanner().scan_directory_incremental(&missing, tx).await;

        assert!(tracks.is_empty());
        match rx.recv().await {
            Some(ScanProgress::Error { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected an error event, got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn plain_file_as_library_root_is_unavailable() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("song.mp3");
        fs::write(&file, b"x").unwrap();
        let (tx, mut rx) = mpsc::channel(16);

        let tracks = scanner().scan_directory_incremental(&file, tx).await;

        assert!(tracks.is_empty());
        match rx.recv().await {
            Some(ScanProgress::Error { path, .. }) => assert_eq!(path, file),
            other => panic!("expected an error event, got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unlistable_library_root_is_unavailable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.mp3"), b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores directory permissions
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let (tx, mut rx) = mpsc::channel(16);
        let tracks = scanner().scan_directory_incremental(&locked, tx).await;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(tracks.is_empty());
        assert!(matches!(rx.recv().await, Some(ScanProgress::Error { .. })));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn incremental_scan_reports_each_track() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one.mp3"), b"x").unwrap();
        fs::write(dir.path().join("two.mp3"), b"y").unwrap();
        let (tx, mut rx) = mpsc::channel(16);

        let tracks = scanner().scan_directory_incremental(dir.path(), tx).await;
        assert_eq!(tracks.len(), 2);

        let mut found = 0;
        let mut completed = None;
        while let Some(event) = rx.recv().await {
            match event {
                ScanProgress::Started { total_files, .. } => assert_eq!(total_files, 2),
                ScanProgress::TrackFound { .. } => found += 1,
                ScanProgress::Completed { total_tracks } => completed = Some(total_tracks),
                ScanProgress::Error { error, .. } => panic!("unexpected error: {}", error),
            }
        }
        assert_eq!(found, 2);
        assert_eq!(completed, Some(2));
    }
}
