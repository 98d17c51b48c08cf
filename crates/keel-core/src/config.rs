//! Configuration system for keel.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $KEEL_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/keel/config.toml
//!   3. ~/.config/keel/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeelConfig {
    pub node: NodeConfig,
    pub dht: DhtConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Local state directory (backend data, caches).
    pub state_dir: PathBuf,
    /// Path to the Ed25519 identity seed. Auto-generated on first run.
    pub keypair_path: PathBuf,
    /// Storage backend name: "disk" or "memory".
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DhtConfig {
    /// Stop gathering once this many candidate records arrived.
    pub quorum: usize,
    /// Max concurrent outbound record requests.
    pub parallelism: usize,
    /// Per-lookup deadline in milliseconds.
    pub lookup_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shell command printing the repository password on stdout.
    /// Empty = no helper configured.
    pub password_command: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            state_dir: data_dir(),
            keypair_path: config_dir().join("keypair"),
            backend: "disk".to_string(),
        }
    }
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            quorum: 16,
            parallelism: 8,
            lookup_timeout_ms: 10_000,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("keel")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("keel")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl KeelConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            KeelConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("KEEL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&KeelConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply KEEL_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("KEEL_NODE__STATE_DIR") {
            self.node.state_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("KEEL_NODE__BACKEND") {
            self.node.backend = v;
        }
        if let Ok(v) = std::env::var("KEEL_DHT__QUORUM") {
            if let Ok(n) = v.parse() {
                self.dht.quorum = n;
            }
        }
        if let Ok(v) = std::env::var("KEEL_DHT__PARALLELISM") {
            if let Ok(n) = v.parse() {
                self.dht.parallelism = n;
            }
        }
        if let Ok(v) = std::env::var("KEEL_DHT__LOOKUP_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.dht.lookup_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("KEEL_SECURITY__PASSWORD_COMMAND") {
            self.security.password_command = v;
        }
    }
}
