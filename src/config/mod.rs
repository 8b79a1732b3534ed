// Configuration management for lyrebird
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::{config_dir, data_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const APP_NAME: &str = "lyrebird";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub watcher: WatcherConfig,
    pub extractor: ExtractorConfig,
    pub audio: AudioSettings,
    pub state: StateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Overrides the development/installed default location.
    pub dir: Option<PathBuf>,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub resume_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library: LibraryConfig::default(),
            watcher: WatcherConfig::default(),
            extractor: ExtractorConfig::default(),
            audio: AudioSettings::default(),
            state: StateConfig::default(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: "mp3".to_string(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 300,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { volume: 0.7 }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        let state_dir = app_data_dir();
        Self {
            resume_path: state_dir.join("resume.json"),
            log_dir: state_dir.join("logs"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Reads `path`, writing the defaults there first if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            info!("Wrote default config to {}", path.display());
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    /// The configured override, else `assets/music` for development builds,
    /// else the per-user data directory.
    pub fn library_dir(&self) -> PathBuf {
        if let Some(dir) = &self.library.dir {
            return dir.clone();
        }
        if cfg!(debug_assertions) {
            PathBuf::from("assets").join("music")
        } else {
            app_data_dir().join("music")
        }
    }

    /// Resolves the library directory and creates it on first run.
    pub fn ensure_library_dir(&self) -> Result<PathBuf> {
        let dir = self.library_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating library directory {}", dir.display()))?;
            info!("Created library directory {}", dir.display());
        }
        Ok(dir)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join(APP_NAME);

        Ok(config_dir.join("config.toml"))
    }
}

fn app_data_dir() -> PathBuf {
    data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.watcher.debounce_ms, 500);
        assert_eq!(config.extractor.max_attempts, 5);
        assert_eq!(config.extractor.retry_delay_ms, 300);
        assert_eq!(config.library.extension, "mp3");
    }

    #[test]
    fn saved_config_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.library.dir = Some(PathBuf::from("/srv/music"));
        config.audio.volume = 0.25;

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[watcher]\ndebounce_ms = 250\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.watcher.debounce_ms, 250);
        assert_eq!(config.extractor, ExtractorConfig::default());
    }

    #[test]
    fn library_dir_override_wins() {
        let mut config = Config::default();
        config.library.dir = Some(PathBuf::from("/srv/music"));
        assert_eq!(config.library_dir(), PathBuf::from("/srv/music"));
    }
}
