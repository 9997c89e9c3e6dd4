//! Repository configuration.
//!
//! Loaded from an optional `gait.toml` at the repo root; absence is not an
//! error, `RepoConfig::default()` applies.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::GaitError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Number of leading hex digits used for the object-store fan-out
    /// directory (`objects/<xx>/<rest>`).
    pub fanout_hex_width: usize,
    /// Branch name `init` creates and checks out by default.
    pub default_branch: String,
    /// Advisory cap for future reflog compaction tooling. The reflog is
    /// append-only by invariant; this never truncates it in v0.
    pub reflog_soft_cap: Option<usize>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            fanout_hex_width: 2,
            default_branch: "main".to_string(),
            reflog_soft_cap: None,
        }
    }
}

impl RepoConfig {
    /// Load `gait.toml` from `repo_root` if present, else the default config.
    pub fn load(repo_root: &Path) -> Result<Self, GaitError> {
        let path = repo_root.join("gait.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        toml::from_str(&text)
            .map_err(|e| GaitError::SchemaError(format!("invalid gait.toml: {e}")))
    }
}
