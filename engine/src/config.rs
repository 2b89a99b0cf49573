use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_data_dir() -> PathBuf {
    PathBuf::from("adventures")
}

fn default_autosave_quiet_ms() -> u64 {
    500
}

fn default_monster_ref_prefix() -> String {
    "https://www.dndbeyond.com/monsters/".to_string()
}

fn default_log_limit() -> usize {
    200
}

/// Console settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_autosave_quiet_ms")]
    pub autosave_quiet_ms: u64,
    /// Fixed RNG seed for reproducible sessions.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_monster_ref_prefix")]
    pub monster_ref_prefix: String,
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_quiet_ms: default_autosave_quiet_ms(),
            seed: None,
            monster_ref_prefix: default_monster_ref_prefix(),
            log_limit: default_log_limit(),
        }
    }
}

impl ConsoleConfig {
    /// Parse YAML (JSON is accepted too, being a subset).
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("invalid console config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn autosave_quiet(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_ms)
    }

    /// Catalog-style page link for a monster name, e.g. "Giant Rat" →
    /// `<prefix>giant-rat`.
    pub fn monster_ref_for(&self, name: &str) -> String {
        let slug: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("{}{}", self.monster_ref_prefix, slug)
    }
}
