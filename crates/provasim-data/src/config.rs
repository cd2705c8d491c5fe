//! provasim configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level provasim configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvasimConfig {
    /// Directory holding `positions.json` and `meta.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding model artifacts.
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    /// Directory attempt reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Optional skill-description catalog file.
    #[serde(default)]
    pub skill_catalog: Option<PathBuf>,
    /// Base URL to fetch reference data from instead of `data_dir`.
    #[serde(default)]
    pub reference_url: Option<String>,
    /// How many preceding years model resolution may fall back to.
    #[serde(default = "default_fallback_depth")]
    pub fallback_depth: u16,
    /// Consistency findings shown per attempt.
    #[serde(default = "default_top_findings")]
    pub top_findings: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./provasim-results")
}
fn default_fallback_depth() -> u16 {
    3
}
fn default_top_findings() -> usize {
    10
}

impl Default for ProvasimConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            models_dir: default_models_dir(),
            output_dir: default_output_dir(),
            skill_catalog: None,
            reference_url: None,
            fallback_depth: default_fallback_depth(),
            top_findings: default_top_findings(),
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `provasim.toml` in the current directory
/// 2. `~/.config/provasim/config.toml`
///
/// Environment overrides: `PROVASIM_DATA_DIR`, `PROVASIM_MODELS_DIR`.
pub fn load_config() -> Result<ProvasimConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ProvasimConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("provasim.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            global.exists().then_some(global)
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ProvasimConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ProvasimConfig::default(),
    };

    if let Ok(dir) = std::env::var("PROVASIM_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("PROVASIM_MODELS_DIR") {
        config.models_dir = PathBuf::from(dir);
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("provasim"))
}
