//! Client connection settings.
//!
//! Reads/writes `~/.openerp/social.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL (e.g. "http://localhost:5000/api").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    /// Bearer token for the signed-in user.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Realtime socket endpoint. Empty means the same host as `server`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub socket_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            token: String::new(),
            request_timeout_ms: default_timeout_ms(),
            socket_url: String::new(),
        }
    }
}

impl ClientConfig {
    /// Default config file path: ~/.openerp/social.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("social.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Socket endpoint, falling back to the API server.
    pub fn socket_url(&self) -> &str {
        if self.socket_url.is_empty() {
            &self.server
        } else {
            &self.socket_url
        }
    }
}

/// Return the OpenERP config directory (~/.openerp).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".openerp")
}
