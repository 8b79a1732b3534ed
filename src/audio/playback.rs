use super::player::AudioOutput;
use super::track::TrackRecord;
use crate::error::PlaybackError;
use crate::resume::{ResumeState, ResumeStore};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_index: Option<usize>,
    pub playing: bool,
    pub position_seconds: f64,
}

/// Owns the playlist position and drives one `AudioOutput`.
///
/// Idle until a track is loaded; after that `playing` flips independently.
/// Every track start and every pause writes the resume record.
pub struct PlaybackController<O, S> {
    output: O,
    store: S,
    tracks: Vec<TrackRecord>,
    current_index: Option<usize>,
    playing: bool,
}

impl<O: AudioOutput, S: ResumeStore> PlaybackController<O, S> {
    pub fn new(output: O, store: S) -> Self {
        Self {
            output,
            store,
            tracks: Vec::new(),
            current_index: None,
            playing: false,
        }
    }

    /// Hand over a freshly scanned library.
    ///
    /// The current index is a raw position and is kept as-is; if the new library
    /// no longer reaches it, playback stops and the controller goes back to idle.
    pub fn set_library(&mut self, tracks: Vec<TrackRecord>) {
        self.tracks = tracks;
        if let Some(index) = self.current_index {
            if index >= self.tracks.len() {
                debug!("Library shrank below index {}, going idle", index);
                self.output.stop();
                self.current_index = None;
                self.playing = false;
            }
        }
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn current_track(&self) -> Option<&TrackRecord> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_index: self.current_index,
            playing: self.playing,
            position_seconds: self.position_seconds(),
        }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Out-of-range indices are ignored.
    pub fn play_track(&mut self, index: usize) -> Result<(), PlaybackError> {
        if index >= self.tracks.len() {
            debug!("Ignoring play request for index {} of {}", index, self.tracks.len());
            return Ok(());
        }
        self.start(index, 0.0)
    }

    pub fn next(&mut self) -> Result<(), PlaybackError> {
        let len = self.tracks.len();
        if len == 0 {
            return Ok(());
        }
        let next = match self.current_index {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        self.start_playable(next, Direction::Forward)
    }

    pub fn prev(&mut self) -> Result<(), PlaybackError> {
        let len = self.tracks.len();
        if len == 0 {
            return Ok(());
        }
        // Idle counts as index -1, so the first step back lands on N-2
        let prev = match self.current_index {
            Some(i) => (i + len - 1) % len,
            None => (2 * len - 2) % len,
        };
        self.start_playable(prev, Direction::Backward)
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        if self.current_index.is_none() {
            return self.resume_from_store();
        }

        if self.playing {
            self.pause();
        } else {
            self.output.play();
            self.playing = true;
            debug!("Resumed at {:.1}s", self.position_seconds());
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        let Some(index) = self.current_index else {
            return;
        };
        if !self.playing {
            return;
        }

        self.output.pause();
        self.playing = false;
        let position = self.position_seconds();
        debug!("Paused track {} at {:.1}s", index, position);
        self.persist(index, position);
    }

    /// Polled by the front end; advances when the output ran dry on its own.
    pub fn tick(&mut self) -> Result<(), PlaybackError> {
        if self.playing && self.current_index.is_some() && self.output.is_finished() {
            return self.on_track_ended();
        }
        Ok(())
    }

    /// Natural end of a track: move on, wrapping to the first track after the last.
    pub fn on_track_ended(&mut self) -> Result<(), PlaybackError> {
        if let Some(track) = self.current_track() {
            debug!("Finished {}", track.file_name);
        }
        self.next()
    }

    fn resume_from_store(&mut self) -> Result<(), PlaybackError> {
        if self.tracks.is_empty() {
            return Ok(());
        }

        match self.store.load().map(|saved| resolve_resume(&saved, &self.tracks)) {
            Some((index, position)) => {
                info!("Resuming track {} at {:.1}s", index, position);
                self.start(index, position)
            }
            None => self.start(0, 0.0),
        }
    }

    /// Starts `from`, or the first track after it in `direction` that loads.
    /// Gives up after one full lap and reports the last failure.
    fn start_playable(&mut self, from: usize, direction: Direction) -> Result<(), PlaybackError> {
        let len = self.tracks.len();
        let mut index = from;
        let mut last_err = None;

        for _ in 0..len {
            match self.start(index, 0.0) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Skipping {}: {}", self.tracks[index].file_name, e);
                    last_err = Some(e);
                }
            }
            index = match direction {
                Direction::Forward => (index + 1) % len,
                Direction::Backward => (index + len - 1) % len,
            };
        }

        last_err.map_or(Ok(()), Err)
    }

    fn start(&mut self, index: usize, position: f64) -> Result<(), PlaybackError> {
        let track = &self.tracks[index];
        if let Err(e) = self.output.load(&track.file_path) {
            // The previous source is already gone; stepping on must continue from here
            self.current_index = Some(index);
            self.playing = false;
            return Err(e);
        }

        let mut position = position;
        if position > 0.0 {
            if let Err(e) = self.output.seek(Duration::from_secs_f64(position)) {
                warn!("Could not seek {} to {:.1}s: {}", track.file_name, position, e);
                position = 0.0;
            }
        }

        self.output.play();
        info!("Now playing: {} by {}", track.title, track.artist);
        self.current_index = Some(index);
        self.playing = true;
        self.persist(index, position);
        Ok(())
    }

    fn persist(&mut self, index: usize, position: f64) {
        let state = ResumeState {
            last_index: index,
            last_position_seconds: position,
            last_file_name: self.tracks.get(index).map(|t| t.file_name.clone()),
        };
        if let Err(e) = self.store.save(&state) {
            warn!("Failed to persist resume state: {}", e);
        }
    }

    fn position_seconds(&self) -> f64 {
        if self.current_index.is_none() {
            return 0.0;
        }
        self.output.position().as_secs_f64()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Where to pick up from a saved record, given the library as it is now.
///
/// The saved file name wins over the raw index. If that file is gone, the
/// nearest valid index is used from the start of the track.
fn resolve_resume(saved: &ResumeState, tracks: &[TrackRecord]) -> (usize, f64) {
    let position = saved.last_position_seconds.max(0.0);

    match &saved.last_file_name {
        Some(name) => match tracks.iter().position(|t| &t.file_name == name) {
            Some(index) => (index, position),
            None => (saved.last_index.min(tracks.len() - 1), 0.0),
        },
        None if saved.last_index < tracks.len() => (saved.last_index, position),
        None => (0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::{JsonResumeStore, MemoryResumeStore};
    use std::path::{Path, PathBuf};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(PathBuf),
        Play,
        Pause,
        Stop,
        Seek(Duration),
    }

    /// Records calls; position and end-of-track are set by the test.
    #[derive(Default)]
    struct FakeOutput {
        calls: Vec<Call>,
        position: Duration,
        finished: bool,
        fail_loads: bool,
        unplayable: Vec<&'static str>,
    }

    impl AudioOutput for FakeOutput {
        fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if self.fail_loads || self.unplayable.iter().any(|u| *u == name) {
                // like rodio: the old sink is dropped before the new file is opened
                self.finished = true;
                return Err(PlaybackError::Decode {
                    path: path.to_path_buf(),
                    reason: "bad frame".into(),
                });
            }
            self.calls.push(Call::Load(path.to_path_buf()));
            self.position = Duration::ZERO;
            self.finished = false;
            Ok(())
        }

        fn play(&mut self) {
            self.calls.push(Call::Play);
        }

        fn pause(&mut self) {
            self.calls.push(Call::Pause);
        }

        fn stop(&mut self) {
            self.calls.push(Call::Stop);
        }

        fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
            self.calls.push(Call::Seek(position));
            self.position = position;
            Ok(())
        }

        fn position(&self) -> Duration {
            self.position
        }

        fn is_finished(&self) -> bool {
            self.finished
        }
    }

    fn library(names: &[&str]) -> Vec<TrackRecord> {
        names
            .iter()
            .map(|n| TrackRecord::fallback(&Path::new("/music").join(n)))
            .collect()
    }

    fn controller(names: &[&str]) -> PlaybackController<FakeOutput, MemoryResumeStore> {
        let mut controller = PlaybackController::new(FakeOutput::default(), MemoryResumeStore::default());
        controller.set_library(library(names));
        controller
    }

    fn loaded(controller: &PlaybackController<FakeOutput, MemoryResumeStore>) -> Vec<PathBuf> {
        controller
            .output()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Load(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn play_track_loads_starts_and_persists() {
        let mut c = controller(&["a.mp3", "b.mp3", "c.mp3"]);
        c.play_track(1).unwrap();

        assert_eq!(c.state().current_index, Some(1));
        assert!(c.state().playing);
        assert_eq!(loaded(&c), vec![PathBuf::from("/music/b.mp3")]);
        let saved = c.store.load().unwrap();
        assert_eq!(saved.last_index, 1);
        assert_eq!(saved.last_position_seconds, 0.0);
        assert_eq!(saved.last_file_name.as_deref(), Some("b.mp3"));
    }

    #[test]
    fn out_of_range_play_is_ignored() {
        let mut c = controller(&["a.mp3"]);
        c.play_track(5).unwrap();

        assert_eq!(c.state().current_index, None);
        assert!(c.output().calls.is_empty());
        assert_eq!(c.store.load(), None);
    }

    #[test]
    fn next_and_prev_wrap_around() {
        let mut c = controller(&["a.mp3", "b.mp3", "c.mp3"]);
        c.play_track(2).unwrap();
        c.next().unwrap();
        assert_eq!(c.state().current_index, Some(0));

        c.prev().unwrap();
        assert_eq!(c.state().current_index, Some(2));
    }

    #[test]
    fn next_and_prev_are_noops_on_empty_library() {
        let mut c = controller(&[]);
        c.next().unwrap();
        c.prev().unwrap();
        c.toggle_play_pause().unwrap();

        assert_eq!(c.state().current_index, None);
        assert!(c.output().calls.is_empty());
    }

    #[test]
    fn toggle_without_saved_state_starts_first_track() {
        let mut c = controller(&["a.mp3", "b.mp3"]);
        c.toggle_play_pause().unwrap();

        assert_eq!(c.state().current_index, Some(0));
        assert!(c.state().playing);
    }

    #[test]
    fn toggle_flips_and_persists_position_on_pause() {
        let mut c = controller(&["a.mp3", "b.mp3"]);
        c.play_track(1).unwrap();
        c.output.position = Duration::from_secs(30);

        c.toggle_play_pause().unwrap();
        assert!(!c.state().playing);
        assert_eq!(c.store.load().unwrap().last_position_seconds, 30.0);

        c.toggle_play_pause().unwrap();
        assert!(c.state().playing);
        assert_eq!(c.output().calls.last(), Some(&Call::Play));
    }

    #[test]
    fn finished_track_auto_advances_and_loops() {
        let mut c = controller(&["a.mp3", "b.mp3"]);
        c.play_track(1).unwrap();

        c.tick().unwrap();
        assert_eq!(c.state().current_index, Some(1));

        c.output.finished = true;
        c.tick().unwrap();
        assert_eq!(c.state().current_index, Some(0));
        assert_eq!(loaded(&c).last(), Some(&PathBuf::from("/music/a.mp3")));
    }

    #[test]
    fn paused_output_does_not_auto_advance() {
        let mut c = controller(&["a.mp3", "b.mp3"]);
        c.play_track(0).unwrap();
        c.pause();
        c.output.finished = true;

        c.tick().unwrap();
        assert_eq!(c.state().current_index, Some(0));
    }

    #[test]
    fn next_steps_over_an_unplayable_track() {
        let mut c = controller(&["a.mp3", "b.mp3", "c.mp3"]);
        c.output.unplayable = vec!["b.mp3"];
        c.play_track(0).unwrap();

        c.next().unwrap();

        assert_eq!(c.state().current_index, Some(2));
        assert!(c.state().playing);
        assert_eq!(loaded(&c).last(), Some(&PathBuf::from("/music/c.mp3")));
        assert_eq!(c.store.load().unwrap().last_file_name.as_deref(), Some("c.mp3"));
    }

    #[test]
    fn auto_advance_steps_over_an_unplayable_track() {
        let mut c = controller(&["a.mp3", "b.mp3", "c.mp3"]);
        c.output.unplayable = vec!["b.mp3"];
        c.play_track(0).unwrap();

        c.output.finished = true;
        c.tick().unwrap();

        assert_eq!(c.state().current_index, Some(2));
        assert!(c.state().playing);
    }

    #[test]
    fn prev_steps_over_an_unplayable_track() {
        let mut c = controller(&["a.mp3", "b.mp3", "c.mp3"]);
        c.output.unplayable = vec!["b.mp3"];
        c.play_track(2).unwrap();

        c.prev().unwrap();

        assert_eq!(c.state().current_index, Some(0));
    }

    #[test]
    fn failed_direct_play_moves_the_cursor_and_next_continues() {
        let mut c = controller(&["a.mp3", "b.mp3", "c.mp3"]);
        c.output.unplayable = vec!["b.mp3"];
        c.play_track(0).unwrap();

        assert!(c.play_track(1).is_err());
        assert_eq!(c.state().current_index, Some(1));
        assert!(!c.state().playing);
        // a stopped cursor is not a finished track
        c.tick().unwrap();
        assert_eq!(c.state().current_index, Some(1));

        c.next().unwrap();
        assert_eq!(c.state().current_index, Some(2));
        assert!(c.state().playing);
    }

    #[test]
    fn nothing_playable_stops_after_one_lap() {
        let mut c = controller(&["a.mp3", "b.mp3"]);
        c.play_track(0).unwrap();
        c.output.fail_loads = true;

        assert!(c.next().is_err());
        assert!(!c.state().playing);
        // the last good track stays the resume point
        assert_eq!(c.store.load().unwrap().last_index, 0);

        c.tick().unwrap();
        assert!(!c.state().playing);
    }

    #[test]
    fn prev_from_idle_treats_idle_as_minus_one() {
        let mut c = controller(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
        c.prev().unwrap();
        assert_eq!(c.state().current_index, Some(2));

        let mut single = controller(&["only.mp3"]);
        single.prev().unwrap();
        assert_eq!(single.state().current_index, Some(0));
    }

    #[test]
    fn shrinking_library_past_current_index_goes_idle() {
        let mut c = controller(&["a.mp3", "b.mp3", "c.mp3"]);
        c.play_track(2).unwrap();

        c.set_library(library(&["a.mp3"]));
        assert_eq!(c.state().current_index, None);
        assert!(!c.state().playing);
        assert_eq!(c.output().calls.last(), Some(&Call::Stop));
    }

    #[test]
    fn pause_then_fresh_controller_resumes_same_track_and_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.json");
        let names = ["a.mp3", "b.mp3", "c.mp3", "d.mp3"];

        let mut first = PlaybackController::new(FakeOutput::default(), JsonResumeStore::new(path.clone()));
        first.set_library(library(&names));
        first.play_track(2).unwrap();
        first.output.position = Duration::from_secs_f64(73.25);
        first.pause();

        let mut second = PlaybackController::new(FakeOutput::default(), JsonResumeStore::new(path));
        second.set_library(library(&names));
        second.toggle_play_pause().unwrap();

        assert_eq!(second.state().current_index, Some(2));
        assert!(second.state().playing);
        assert_eq!(
            second.output().calls,
            vec![
                Call::Load(PathBuf::from("/music/c.mp3")),
                Call::Seek(Duration::from_secs_f64(73.25)),
                Call::Play,
            ]
        );
    }

    #[test]
    fn resume_follows_the_file_name_when_the_library_reorders() {
        let saved = ResumeState {
            last_index: 0,
            last_position_seconds: 10.0,
            last_file_name: Some("c.mp3".into()),
        };
        let tracks = library(&["b.mp3", "c.mp3"]);
        assert_eq!(resolve_resume(&saved, &tracks), (1, 10.0));
    }

    #[test]
    fn resume_falls_back_to_nearest_index_when_the_file_is_gone() {
        let saved = ResumeState {
            last_index: 7,
            last_position_seconds: 10.0,
            last_file_name: Some("gone.mp3".into()),
        };
        let tracks = library(&["a.mp3", "b.mp3"]);
        assert_eq!(resolve_resume(&saved, &tracks), (1, 0.0));
    }

    #[test]
    fn legacy_resume_uses_raw_index_or_first_track() {
        let tracks = library(&["a.mp3", "b.mp3"]);
        let valid = ResumeState {
            last_index: 1,
            last_position_seconds: 5.0,
            last_file_name: None,
        };
        let stale = ResumeState { last_index: 9, ..valid.clone() };

        assert_eq!(resolve_resume(&valid, &tracks), (1, 5.0));
        assert_eq!(resolve_resume(&stale, &tracks), (0, 0.0));
    }

    #[test]
    fn resume_with_memory_store_seeks_to_saved_position() {
        let store = MemoryResumeStore::with_state(ResumeState {
            last_index: 1,
            last_position_seconds: 42.0,
            last_file_name: Some("b.mp3".into()),
        });
        let mut c = PlaybackController::new(FakeOutput::default(), store);
        c.set_library(library(&["a.mp3", "b.mp3"]));

        c.toggle_play_pause().unwrap();
        assert_eq!(c.state().current_index, Some(1));
        assert_eq!(c.state().position_seconds, 42.0);
        assert_eq!(c.store.load().unwrap().last_position_seconds, 42.0);
    }
}
