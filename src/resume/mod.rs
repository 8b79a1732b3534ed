// Resume state - where playback stopped, so the next session can pick it up
// One small JSON record, rewritten on every track start and every pause

use crate::error::ResumeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeState {
    pub last_index: usize,
    pub last_position_seconds: f64,
    /// Identity of the track at `last_index` when it was saved. Older records lack it.
    #[serde(default)]
    pub last_file_name: Option<String>,
}

pub trait ResumeStore {
    /// Missing or unreadable state is simply "nothing to resume".
    fn load(&self) -> Option<ResumeState>;
    fn save(&mut self, state: &ResumeState) -> Result<(), ResumeError>;
}

#[derive(Debug, Clone)]
pub struct JsonResumeStore {
    path: PathBuf,
}

impl JsonResumeStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResumeStore for JsonResumeStore {
    fn load(&self) -> Option<ResumeState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No resume state at {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring corrupt resume state {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&mut self, state: &ResumeState) -> Result<(), ResumeError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash mid-write never leaves half a record behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process store; state lives as long as the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryResumeStore {
    state: Option<ResumeState>,
}

impl MemoryResumeStore {
    pub fn with_state(state: ResumeState) -> Self {
        Self { state: Some(state) }
    }
}

impl ResumeStore for MemoryResumeStore {
    fn load(&self) -> Option<ResumeState> {
        self.state.clone()
    }

    fn save(&mut self, state: &ResumeState) -> Result<(), ResumeError> {
        self.state = Some(state.clone());
        Ok(())
    }
}
