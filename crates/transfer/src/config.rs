use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_MAX_TOTAL_PARTS, DEFAULT_SESSION_TTL_SECS};

/// What a `[FILE START]` does when its id already has a live session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    /// Discard the old session and every chunk it received.
    #[default]
    Replace,
    /// Refuse with `session already exists`; the sender must cancel first.
    Reject,
}

/// Assembler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Sandbox root; every received file lands at or below it.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Sessions older than this are dropped on the next inbound message.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default)]
    pub restart_policy: RestartPolicy,

    /// Largest `total_parts` a `[FILE START]` may announce.
    #[serde(default = "default_max_total_parts")]
    pub max_total_parts: u32,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("received")
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_max_total_parts() -> u32 {
    DEFAULT_MAX_TOTAL_PARTS
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            session_ttl_secs: default_session_ttl_secs(),
            restart_policy: RestartPolicy::default(),
            max_total_parts: default_max_total_parts(),
        }
    }
}

impl AssemblerConfig {
    /// Default configuration rooted at `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
