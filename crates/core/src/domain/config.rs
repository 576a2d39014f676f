//! Configuration management for Sonus
//!
//! This module provides:
//! - Configuration structs for application, audio and channel settings
//! - Profile system storing named channel layouts as TOML
//! - Environment overrides for the settings operators tune most often
//! - Profile directory watcher for following on-disk edits

use crate::domain::channel::{ChannelRecord, ChannelStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, trace, warn};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_name: String,

    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,

    /// Optional log file, written in addition to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Interval for an optional UI-driven re-scan (0 = disabled)
    pub auto_refresh_interval_secs: u64,

    /// Profile directory; relative paths resolve against the config directory
    pub profile_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Sonus Mixer".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            auto_refresh_interval_secs: 5,
            profile_dir: PathBuf::from("profiles"),
        }
    }
}

/// Audio behaviour settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Process-name fragments hidden from the application list
    pub excluded_processes: Vec<String>,

    /// Timeout for the external default-device switch command
    pub device_switch_timeout_secs: u64,

    /// Switch default devices through the PowerShell helper
    pub use_shell_device_switch: bool,

    /// Attach process icons to the application list
    pub show_app_icons: bool,

    /// Endpoint-name fragments that mark a virtual audio cable
    pub virtual_cable_keywords: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            excluded_processes: [
                "svchost", "dwm", "winlogon", "csrss", "audiodg", "lsass", "smss", "wininit",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            device_switch_timeout_secs: 5,
            use_shell_device_switch: cfg!(windows),
            show_app_icons: true,
            virtual_cable_keywords: ["CABLE", "VB-Audio", "Virtual", "Voicemeeter", "VAC"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Complete Sonus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonusConfig {
    pub app: AppConfig,
    pub audio: AudioSettings,
    pub channels: Vec<ChannelRecord>,
}

impl Default for SonusConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            audio: AudioSettings::default(),
            channels: ChannelStore::new().records(),
        }
    }
}

impl SonusConfig {
    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    /// Create factory default configuration
    pub fn factory_default() -> Self {
        Self::default()
    }

    /// Apply `SONUS_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("SONUS_LOG_LEVEL") {
            self.app.log_level = level;
        }
        if let Some(file) = lookup("SONUS_LOG_FILE") {
            self.app.log_file = (!file.is_empty()).then(|| PathBuf::from(file));
        }
        if let Some(secs) = parse_override(&lookup, "SONUS_SWITCH_TIMEOUT") {
            self.audio.device_switch_timeout_secs = secs;
        }
        if let Some(secs) = parse_override(&lookup, "SONUS_REFRESH_INTERVAL") {
            self.app.auto_refresh_interval_secs = secs;
        }
    }
}

fn parse_override<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable override");
            None
        }
    }
}

/// A profile file changing under the watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    Changed(String),
    Removed(String),
}

impl ProfileEvent {
    /// Classify one file system notification for a profile path
    pub fn from_notify(kind: &notify::EventKind, path: &Path) -> Option<Self> {
        use notify::EventKind;

        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            return None;
        }
        let name = path.file_stem()?.to_str()?.to_string();

        match kind {
            EventKind::Create(_) | EventKind::Modify(_) => Some(Self::Changed(name)),
            EventKind::Remove(_) => Some(Self::Removed(name)),
            _ => None,
        }
    }

    pub fn profile(&self) -> &str {
        match self {
            Self::Changed(name) | Self::Removed(name) => name,
        }
    }
}

/// Watches the profile directory so a loaded profile can follow edits made
/// on disk
pub struct ProfileWatcher {
    _watcher: notify::RecommendedWatcher,
    events_tx: broadcast::Sender<ProfileEvent>,
}

impl ProfileWatcher {
    pub async fn new(profile_dir: PathBuf) -> Result<Self> {
        use notify::Watcher;

        let (events_tx, _) = broadcast::channel(32);
        fs::create_dir_all(&profile_dir).await?;

        let tx = events_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Profile watch error");
                    return;
                }
            };
            for path in &event.paths {
                if let Some(change) = ProfileEvent::from_notify(&event.kind, path) {
                    trace!(?change, "Profile file event");
                    if tx.send(change).is_err() {
                        debug!("No listener for profile event");
                    }
                }
            }
        })?;

        watcher.watch(&profile_dir, notify::RecursiveMode::NonRecursive)?;
        info!(path = %profile_dir.display(), "Profile watcher started");

        Ok(Self {
            _watcher: watcher,
            events_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProfileEvent> {
        self.events_tx.subscribe()
    }
}

/// A named channel layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ChannelRecord>,
}

/// Profile manager
pub struct ProfileManager {
    profile_dir: PathBuf,
}

impl ProfileManager {
    pub fn new(profile_dir: PathBuf) -> Self {
        Self { profile_dir }
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    fn profile_path(&self, name: &str) -> Result<PathBuf> {
        validate_profile_name(name)?;
        Ok(self.profile_dir.join(format!("{}.toml", name)))
    }

    /// List all available profiles
    #[instrument(skip(self))]
    pub async fn list_profiles(&self) -> Result<Vec<String>> {
        let mut profiles = Vec::new();

        if !self.profile_dir.exists() {
            return Ok(profiles);
        }

        let mut entries = fs::read_dir(&self.profile_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    profiles.push(name.to_string());
                }
            }
        }

        profiles.sort();
        debug!(count = profiles.len(), "Listed profiles");
        Ok(profiles)
    }

    /// Load a profile by name
    #[instrument(skip(self))]
    pub async fn load_profile(&self, name: &str) -> Result<Profile> {
        let path = self.profile_path(name)?;

        if !path.exists() {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }

        let contents = fs::read_to_string(&path).await?;
        let profile: Profile = toml::from_str(&contents)?;
        info!(name, channels = profile.channels.len(), "Profile loaded");
        Ok(profile)
    }

    /// Save a channel layout under `name`
    #[instrument(skip(self, channels))]
    pub async fn save_profile(&self, name: &str, channels: Vec<ChannelRecord>) -> Result<()> {
        let path = self.profile_path(name)?;
        fs::create_dir_all(&self.profile_dir).await?;

        let profile = Profile {
            name: name.to_string(),
            channels,
        };
        fs::write(&path, toml::to_string_pretty(&profile)?).await?;

        info!(name, "Profile saved");
        Ok(())
    }

    /// Delete a profile by name
    #[instrument(skip(self))]
    pub async fn delete_profile(&self, name: &str) -> Result<()> {
        let path = self.profile_path(name)?;

        if !path.exists() {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        info!(name, "Profile deleted");
        Ok(())
    }

    /// Check if a profile exists
    pub async fn profile_exists(&self, name: &str) -> bool {
        self.profile_path(name).map(|p| p.exists()).unwrap_or(false)
    }
}

/// Profile names become file names, so keep them to a safe alphabet
fn validate_profile_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid("Profile name cannot be empty".to_string()));
    }
    if name.chars().count() > 64 {
        return Err(ConfigError::Invalid("Profile name too long (max 64 characters)".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ' ')
    {
        return Err(ConfigError::Invalid(format!(
            "Profile name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

/// Configuration manager for the main Sonus config
///
/// Manages the main configuration file at `~/.config/sonus/config.toml`.
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");

        Self {
            config_dir,
            config_path,
        }
    }

    /// Get the default config directory path
    ///
    /// Returns `~/.config/sonus` on Linux, `~/Library/Application Support/sonus`
    /// on macOS and `%APPDATA%\sonus` on Windows.
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("sonus"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolve the configured profile directory
    pub fn profile_dir(&self, config: &SonusConfig) -> PathBuf {
        if config.app.profile_dir.is_absolute() {
            config.app.profile_dir.clone()
        } else {
            self.config_dir.join(&config.app.profile_dir)
        }
    }

    /// Load configuration from file
    ///
    /// If the config file doesn't exist, returns factory default.
    /// If the config file is corrupt, logs an error and returns factory default.
    #[instrument(skip(self))]
    pub async fn load(&self) -> SonusConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating factory default"
            );

            let config = SonusConfig::factory_default();

            if let Err(e) = config.save_to_file(&self.config_path).await {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save factory default config"
                );
            }

            return config;
        }

        match SonusConfig::load_from_file(&self.config_path).await {
            Ok(config) => {
                info!(
                    path = %self.config_path.display(),
                    "Configuration loaded successfully"
                );
                config
            }
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using factory default"
                );

                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                SonusConfig::factory_default()
            }
        }
    }

    /// Save configuration to file
    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &SonusConfig) -> Result<()> {
        fs::create_dir_all(&self.config_dir).await?;
        config.save_to_file(&self.config_path).await
    }

    /// Clear configuration (delete config file)
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path).await?;
            info!(
                path = %self.config_path.display(),
                "Configuration cleared"
            );
        }

        Ok(())
    }

    /// Check if config file exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}
