// ABOUTME: Configuration management for the NOBEL install helper
// ABOUTME: Per-user server identity store and installer tunables, both JSON on disk

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::models::ServerName;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Persists the one piece of state the installer keeps: which server it installed to.
pub trait ConfigStore: Send + Sync {
    /// Stored server identity, `None` when never written (or written empty).
    fn server_name(&self) -> Result<Option<ServerName>, ConfigError>;

    fn set_server_name(&self, server: &ServerName) -> Result<(), ConfigError>;

    /// Remove the stored identity. Succeeds when nothing is stored.
    fn clear(&self) -> Result<(), ConfigError>;
}

/// On-disk shape of the per-user config document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserConfig {
    #[serde(rename = "serverName", default, skip_serializing_if = "Option::is_none")]
    server_name: Option<String>,
}

/// JSON document in the user's config directory (`<config>/Nobel/config.json`).
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store in the per-user `Nobel` namespace.
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::at(Self::default_path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the config file path based on OS
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirFound)?;
        Ok(config_dir.join("Nobel").join("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<UserConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(UserConfig::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, config: &UserConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    fn server_name(&self) -> Result<Option<ServerName>, ConfigError> {
        let config = self.load()?;
        Ok(config
            .server_name
            .filter(|s| !s.is_empty())
            .map(ServerName::new))
    }

    fn set_server_name(&self, server: &ServerName) -> Result<(), ConfigError> {
        // A corrupt document holds nothing worth keeping; overwrite it.
        let mut config = match self.load() {
            Ok(config) => config,
            Err(ConfigError::ParseError(e)) => {
                warn!(
                    "Replacing unreadable config file {}: {}",
                    self.path.display(),
                    e
                );
                UserConfig::default()
            }
            Err(e) => return Err(e),
        };
        config.server_name = Some(server.as_str().to_string());
        self.save(&config)
    }

    fn clear(&self) -> Result<(), ConfigError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, for embedding and tests.
#[derive(Default)]
pub struct MemoryConfigStore {
    value: Mutex<Option<String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(server: &str) -> Self {
        Self {
            value: Mutex::new(Some(server.to_string())),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn server_name(&self) -> Result<Option<ServerName>, ConfigError> {
        let value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        Ok(value
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(ServerName::new))
    }

    fn set_server_name(&self, server: &ServerName) -> Result<(), ConfigError> {
        let mut value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *value = Some(server.as_str().to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ConfigError> {
        let mut value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *value = None;
        Ok(())
    }
}

/// Installer tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerSettings {
    /// Elevation helper, resolved relative to the executable's directory.
    #[serde(rename = "elevationHelper", default = "default_elevation_helper")]
    pub elevation_helper: String,
    #[serde(rename = "elevationTimeoutMs", default = "default_elevation_timeout_ms")]
    pub elevation_timeout_ms: u64,
    /// Abort the install when elevation times out or fails instead of attempting CREATE anyway.
    #[serde(rename = "requireElevation", default)]
    pub require_elevation: bool,
    #[serde(rename = "createRetryDeadlineMs", default = "default_create_deadline_ms")]
    pub create_retry_deadline_ms: u64,
    #[serde(rename = "createRetryIntervalMs", default = "default_create_interval_ms")]
    pub create_retry_interval_ms: u64,
    #[serde(rename = "connectTimeoutSecs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(rename = "logFile", default = "default_log_file")]
    pub log_file: PathBuf,
    /// Load the install script from disk instead of the embedded copy.
    #[serde(rename = "scriptPath", default)]
    pub script_path: Option<PathBuf>,
}

fn default_elevation_helper() -> String {
    "addselftosqlsysadmin.cmd".to_string()
}

fn default_elevation_timeout_ms() -> u64 {
    20_000
}

fn default_create_deadline_ms() -> u64 {
    30_000
}

fn default_create_interval_ms() -> u64 {
    500
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_log_file() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\InstallLog.txt")
    } else {
        std::env::temp_dir().join("InstallLog.txt")
    }
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            elevation_helper: default_elevation_helper(),
            elevation_timeout_ms: default_elevation_timeout_ms(),
            require_elevation: false,
            create_retry_deadline_ms: default_create_deadline_ms(),
            create_retry_interval_ms: default_create_interval_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            log_file: default_log_file(),
            script_path: None,
        }
    }
}

impl InstallerSettings {
    pub const FILE_NAME: &'static str = "nobel-installer.json";

    /// Settings file beside the running executable
    pub fn settings_path() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        Some(exe.parent()?.join(Self::FILE_NAME))
    }

    /// Load settings from beside the executable, or defaults if there is no file
    pub fn load() -> Result<Self, ConfigError> {
        match Self::settings_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Full path of the elevation helper, next to the executable when possible.
    pub fn elevation_helper_path(&self) -> PathBuf {
        let helper = Path::new(&self.elevation_helper);
        if helper.is_absolute() {
            return helper.to_path_buf();
        }
        match std::env::current_exe() {
            Ok(exe) => exe
                .parent()
                .map(|dir| dir.join(helper))
                .unwrap_or_else(|| helper.to_path_buf()),
            Err(_) => helper.to_path_buf(),
        }
    }

    pub fn elevation_timeout(&self) -> Duration {
        Duration::from_millis(self.elevation_timeout_ms)
    }

    pub fn create_retry_deadline(&self) -> Duration {
        Duration::from_millis(self.create_retry_deadline_ms)
    }

    pub fn create_retry_interval(&self) -> Duration {
        Duration::from_millis(self.create_retry_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
