// Terminal front end - the stand-in for a GUI shell
// Keys in, status lines out; the player itself lives in audio::playback

pub mod events; // keyboard event handling

pub use events::{AppEvent, EventHandler};

use anyhow::Result;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Raw mode for single-key controls; restored on drop, even on early return.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Raw mode needs explicit carriage returns.
pub fn status(message: &str) {
    print!("{}\r\n", message);
}

#[cfg(feature = "audio")]
pub use self::player::run_player;

#[cfg(feature = "audio")]
mod player {
    use super::{status, AppEvent, EventHandler, RawModeGuard};
    use crate::audio::{AudioConfig, PlaybackController, RodioOutput, TrackRecord};
    use crate::config::Config;
    use crate::error::PlaybackError;
    use crate::library::Library;
    use crate::resume::JsonResumeStore;
    use anyhow::Result;
    use std::time::Duration;
    use tracing::{error, info};

    const HELP: &str = "space play/pause · n next · b prev · 1-9 jump · p pause · r rescan · l list · q quit";

    type Controller = PlaybackController<RodioOutput, JsonResumeStore>;

    /// Interactive player: scans, watches the folder, and drives playback from the keyboard.
    pub async fn run_player(config: &Config, library: &Library) -> Result<()> {
        let output = RodioOutput::new(AudioConfig::from(config))?;
        let store = JsonResumeStore::new(config.state.resume_path.clone());
        let mut controller = PlaybackController::new(output, store);

        let (_watcher, mut changes) =
            library.watch(Duration::from_millis(config.watcher.debounce_ms))?;

        let mut events = EventHandler::new();
        events.spawn_key_reader();
        let _raw = RawModeGuard::enable()?;

        rescan(&mut controller, library).await;
        status(HELP);

        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        loop {
            tokio::select! {
                Some(event) = events.next_event() => {
                    if event == AppEvent::Quit {
                        break;
                    }
                    handle_event(&mut controller, library, event).await;
                }
                Some(changed) = changes.recv() => {
                    info!("Library changed near {:?}, rescanning", changed.file_name);
                    rescan(&mut controller, library).await;
                }
                _ = ticker.tick() => {
                    let before = controller.state().current_index;
                    let result = controller.tick();
                    report(&controller, result, before);
                }
            }
        }

        // Leaving counts as a pause so the position survives the restart
        controller.pause();
        status("Bye.");
        Ok(())
    }

    async fn handle_event(controller: &mut Controller, library: &Library, event: AppEvent) {
        let before = controller.state().current_index;
        let result = match event {
            AppEvent::TogglePlayPause => controller.toggle_play_pause(),
            AppEvent::Pause => {
                controller.pause();
                Ok(())
            }
            AppEvent::NextTrack => controller.next(),
            AppEvent::PreviousTrack => controller.prev(),
            AppEvent::PlayIndex(index) => controller.play_track(index),
            AppEvent::RefreshLibrary => {
                rescan(controller, library).await;
                Ok(())
            }
            AppEvent::ListLibrary => {
                list(controller.tracks(), controller.state().current_index);
                Ok(())
            }
            AppEvent::Quit => Ok(()),
        };
        report(controller, result, before);
    }

    async fn rescan(controller: &mut Controller, library: &Library) {
        let tracks = library.scan().await;
        status(&format!("Loaded {} songs from {}", tracks.len(), library.dir().display()));
        if tracks.is_empty() {
            status("No MP3 files found in the music folder.");
        }
        controller.set_library(tracks);
    }

    fn report(controller: &Controller, result: Result<(), PlaybackError>, before: Option<usize>) {
        match result {
            Ok(()) => {
                let state = controller.state();
                if state.current_index != before {
                    if let Some(track) = controller.current_track() {
                        status(&format!("Now playing: \"{}\" by {}", track.title, track.artist));
                    }
                }
            }
            Err(e) => {
                error!("Playback failed: {}", e);
                status(&format!("Playback failed: {}", e));
            }
        }
    }

    fn list(tracks: &[TrackRecord], current: Option<usize>) {
        for (i, track) in tracks.iter().enumerate() {
            let marker = if Some(i) == current { ">" } else { " " };
            status(&format!("{} {:>3}. {}", marker, i + 1, track.display_line()));
        }
    }
}
