//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration and the default
//! locations of the inventory and credential files.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::LivenessMode;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/driftscan)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve the per-user directories. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "driftscan", "driftscan")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Default inventory location.
    pub fn inventory_file(&self) -> PathBuf {
        self.config_dir.join("inventory.json")
    }

    /// Default credentials location.
    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.json")
    }
}

/// Application-wide settings. Every field has a default, so partial files
/// are fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,
    /// Hosts scanned at the same time.
    pub host_concurrency: usize,
    /// Port probes in flight across all hosts.
    pub port_concurrency: usize,
    /// Maximum probes per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Liveness check before port probing.
    pub liveness: LivenessMode,
    /// Inventory file; the config directory default is used when unset.
    pub inventory_path: Option<PathBuf>,
    /// Credentials file; the config directory default is used when unset.
    pub credentials_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 4,
            host_concurrency: 64,
            port_concurrency: 500,
            rate_limit: 0,
            liveness: LivenessMode::Icmp,
            inventory_path: None,
            credentials_path: None,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, or defaults if the file
    /// does not exist.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let file = paths.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    pub fn inventory_file(&self, paths: &Paths) -> PathBuf {
        self.inventory_path
            .clone()
            .unwrap_or_else(|| paths.inventory_file())
    }

    pub fn credentials_file(&self, paths: &Paths) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(|| paths.credentials_file())
    }
}
