use lyrebird::audio::{MetadataExtractor, MusicScanner, ScanProgress};
use lyrebird::audio::track::format_duration;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Lyrebird Scanner Test");
    println!("=====================");

    let music_dir = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => lyrebird::Config::load()?.library_dir(),
    };

    println!("Scanning music directory: {:?}", music_dir);

    let scanner = MusicScanner::new("mp3", MetadataExtractor::default());
    let (tx, mut rx) = mpsc::channel(32);

    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            match progress {
                ScanProgress::Started { total_files, .. } => println!("{} candidate file(s)", total_files),
                ScanProgress::TrackFound { track, progress, total } => {
                    println!("[{}/{}] {}", progress, total, track.display_line());
                    println!("   Album: {}  Year: {}", track.album, track.year);
                    println!("   Path: {}", track.file_uri());
                }
                ScanProgress::Completed { total_tracks } => println!("Done: {} track(s)", total_tracks),
                ScanProgress::Error { path, error } => println!("Error scanning {:?}: {}", path, error),
            }
        }
    });

    let tracks = scanner.scan_directory_incremental(&music_dir, tx).await;
    printer.await?;

    let total: f64 = tracks.iter().map(|t| t.duration).sum();
    println!("\nTotal playing time: {}", format_duration(total));

    Ok(())
}
