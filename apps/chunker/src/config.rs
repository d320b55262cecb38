//! Chunker configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/saveme/chunker.toml`
//! - Windows: `%APPDATA%/saveme/chunker.toml`
//!
//! ```toml
//! chunk_size = 2000
//! gzip = true
//!
//! [assembler]
//! root_dir = "received"
//! session_ttl_secs = 900
//! restart_policy = "replace"
//! max_total_parts = 100000
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use saveme_transfer::{AssemblerConfig, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base64 characters per outbound chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Gzip outbound payloads.
    #[serde(default = "default_true")]
    pub gzip: bool,

    /// Receiving side.
    #[serde(default)]
    pub assembler: AssemblerConfig,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            gzip: default_true(),
            assembler: AssemblerConfig::default(),
        }
    }
}

impl Config {
    /// Loads `explicit` if given (it must exist), otherwise the platform
    /// config file, falling back to defaults when that file is absent.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = config_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("saveme").join("chunker.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("saveme")
            .join("chunker.toml")
    }
}
