use crate::error::PlaybackError;
use std::path::Path;
use std::time::Duration;

/// The audio primitive the playback controller drives.
///
/// `load` prepares a source without starting it; `play` starts or resumes.
pub trait AudioOutput {
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError>;
    fn position(&self) -> Duration;
    /// True once a loaded source has played to its end (or nothing is loaded).
    fn is_finished(&self) -> bool;
}

#[cfg(feature = "audio")]
pub use self::rodio_output::RodioOutput;

#[cfg(feature = "audio")]
mod rodio_output {
    use super::AudioOutput;
    use crate::audio::AudioConfig;
    use crate::error::PlaybackError;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use std::time::Duration;
    use tracing::debug;

    /// Default output device through rodio. Not `Send`: keep it on the thread that made it.
    pub struct RodioOutput {
        _stream: OutputStream,
        stream_handle: OutputStreamHandle,
        sink: Option<Sink>,
        config: AudioConfig,
    }

    impl RodioOutput {
        pub fn new(config: AudioConfig) -> Result<Self, PlaybackError> {
            let (stream, stream_handle) =
                OutputStream::try_default().map_err(|e| PlaybackError::Output(e.to_string()))?;

            Ok(Self {
                _stream: stream,
                stream_handle,
                sink: None,
                config,
            })
        }

        pub fn set_volume(&mut self, volume: f32) {
            self.config.volume = volume.clamp(0.0, 1.0);
            if let Some(sink) = &self.sink {
                sink.set_volume(self.config.volume);
            }
        }

        pub fn volume(&self) -> f32 {
            self.config.volume
        }
    }

    impl AudioOutput for RodioOutput {
        fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
            self.stop();

            let file = File::open(path).map_err(|source| PlaybackError::Open {
                path: path.to_path_buf(),
                source,
            })?;
            let source = Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

            let sink =
                Sink::try_new(&self.stream_handle).map_err(|e| PlaybackError::Output(e.to_string()))?;
            sink.set_volume(self.config.volume);
            sink.pause();
            sink.append(source);

            debug!("Loaded {}", path.display());
            self.sink = Some(sink);
            Ok(())
        }

        fn play(&mut self) {
            if let Some(sink) = &self.sink {
                sink.play();
            }
        }

        fn pause(&mut self) {
            if let Some(sink) = &self.sink {
                sink.pause();
            }
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
            match &self.sink {
                Some(sink) => sink
                    .try_seek(position)
                    .map_err(|e| PlaybackError::Seek(e.to_string())),
                None => Ok(()),
            }
        }

        fn position(&self) -> Duration {
            self.sink.as_ref().map(Sink::get_pos).unwrap_or_default()
        }

        fn is_finished(&self) -> bool {
            self.sink.as_ref().map(Sink::empty).unwrap_or(true)
        }
    }
}
