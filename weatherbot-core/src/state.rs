use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Sync position persisted between runs, so a restart doesn't replay old history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub next_batch: Option<String>,
}

impl SyncState {
    /// Load state from disk, or start fresh if the file doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync state: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse sync state: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize sync state")?;
        fs::write(path, toml)
            .with_context(|| format!("Failed to write sync state: {}", path.display()))?;

        debug!(next_batch = ?self.next_batch, path = %path.display(), "saved sync state");
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("link", "continuum", "weatherbot")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;

        Ok(dirs.data_dir().join("sync_state.toml"))
    }
}
