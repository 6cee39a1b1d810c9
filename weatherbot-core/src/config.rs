use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{matrix::UserId, state::SyncState};

/// Timing knobs of the bot loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    /// Queries older than this are not answered.
    pub stale_after_secs: u64,
    /// Wait after a failed sync before retrying.
    pub retry_delay_secs: u64,
    /// How long the homeserver may hold a `/sync` request.
    pub sync_timeout_secs: u64,
}

impl Default for BotTuning {
    fn default() -> Self {
        Self { stale_after_secs: 30, retry_delay_secs: 60, sync_timeout_secs: 30 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// homeserver = "https://matrix.example.org"
/// user_id = "@weatherbot:example.org"
///
/// [bot]
/// stale_after_secs = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub homeserver: Option<String>,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub weather_token: Option<String>,
    /// HTTP proxy url.
    pub proxy: Option<String>,
    /// Extra PEM certificate to trust.
    pub trust: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub bot: BotTuning,
}

/// Everything needed to start the bot, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub homeserver: Url,
    pub user_id: UserId,
    pub access_token: String,
    pub weather_token: String,
    pub proxy: Option<String>,
    pub trust: Option<PathBuf>,
    pub state_file: PathBuf,
    pub stale_after: Duration,
    pub retry_delay: Duration,
    pub sync_timeout: Duration,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("link", "continuum", "weatherbot")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Lay `overrides` on top of `self`; values present in `overrides` win.
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            homeserver: overrides.homeserver.or(self.homeserver),
            user_id: overrides.user_id.or(self.user_id),
            access_token: overrides.access_token.or(self.access_token),
            weather_token: overrides.weather_token.or(self.weather_token),
            proxy: overrides.proxy.or(self.proxy),
            trust: overrides.trust.or(self.trust),
            state_file: overrides.state_file.or(self.state_file),
            bot: if overrides.bot != BotTuning::default() { overrides.bot } else { self.bot },
        }
    }

    /// Validate into [`Settings`].
    pub fn resolve(self) -> Result<Settings> {
        let user = self.user_id.ok_or_else(|| {
            anyhow!("No user id supplied.\nHint: pass --user @name:server or run `weatherbot configure`.")
        })?;
        let user_id = UserId::parse(&user)?;

        let server = self.homeserver.ok_or_else(|| {
            anyhow!("No homeserver supplied.\nHint: pass --server https://... or run `weatherbot configure`.")
        })?;
        let homeserver = Url::parse(&server)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| anyhow!("Invalid homeserver url {server}"))?;

        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("No TOKEN supplied.\nHint: set the TOKEN environment variable."))?;

        let weather_token = self.weather_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            anyhow!("No token supplied for weather api.\nHint: set the WEATHER_TOKEN environment variable.")
        })?;

        let state_file = match self.state_file {
            Some(path) => path,
            None => SyncState::default_path()?,
        };

        Ok(Settings {
            homeserver,
            user_id,
            access_token,
            weather_token,
            proxy: self.proxy,
            trust: self.trust,
            state_file,
            stale_after: Duration::from_secs(self.bot.stale_after_secs),
            retry_delay: Duration::from_secs(self.bot.retry_delay_secs),
            sync_timeout: Duration::from_secs(self.bot.sync_timeout_secs),
        })
    }
}
