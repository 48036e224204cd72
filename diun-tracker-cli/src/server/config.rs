use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

/// Top-level diun-tracker.toml configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct TrackerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Memory,
}

// ── Default value functions ──────────────────────────

fn default_hostname() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("updates.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a TOML file, falling back to defaults if the file
    /// doesn't exist or cannot be parsed.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                warn!("failed to parse {}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment overrides (`APP_IP`, `APP_PORT`,
    /// `DIUN_TRACKER_STORAGE`, `DIUN_TRACKER_STORAGE_FILE`) read via `lookup`.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("APP_IP") {
            self.server.hostname = val;
        }

        if let Some(val) = lookup("APP_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("ignoring invalid APP_PORT value: {}", val),
            }
        }

        if let Some(val) = lookup("DIUN_TRACKER_STORAGE") {
            match val.to_lowercase().as_str() {
                "file" => self.storage.backend = StorageBackend::File,
                "memory" => self.storage.backend = StorageBackend::Memory,
                other => warn!("unknown DIUN_TRACKER_STORAGE value: {}", other),
            }
        }

        if let Some(val) = lookup("DIUN_TRACKER_STORAGE_FILE") {
            if !val.trim().is_empty() {
                self.storage.path = PathBuf::from(val);
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.hostname, self.server.port)
    }
}
