//! `~/.pseudo/config.yaml`.
//!
//! ```yaml
//! default_model: local
//! max_concurrent_jobs: 4
//! models:
//!   local:
//!     command: ["llm-bridge", "--model", "small"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};
use crate::registry::{home, pseudo_root_at, set_dir_permissions, write_atomic};

fn default_max_concurrent_jobs() -> usize {
    4
}

/// How to reach one model: an argv spawned per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCommand {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Model ref stamped on jobs submitted without `--model`.
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default)]
    pub models: BTreeMap<String, ModelCommand>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: None,
            max_concurrent_jobs: default_max_concurrent_jobs(),
            models: BTreeMap::new(),
        }
    }
}

/// `<home>/.pseudo/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    pseudo_root_at(home).join("config.yaml")
}

/// Load the config, falling back to defaults when the file is absent.
pub fn load_config_at(home: &Path) -> Result<Config, StoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// `load_config_at` convenience wrapper.
pub fn load_config() -> Result<Config, StoreError> {
    load_config_at(&home()?)
}

/// Atomically write the config, creating `~/.pseudo/` (mode `0700`) if needed.
pub fn save_config_at(home: &Path, config: &Config) -> Result<(), StoreError> {
    let root = pseudo_root_at(home);
    if !root.exists() {
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        set_dir_permissions(&root)?;
    }
    let yaml = serde_yaml::to_string(config)?;
    write_atomic(&config_path_at(home), yaml.as_bytes())
}

/// `save_config_at` convenience wrapper.
pub fn save_config(config: &Config) -> Result<(), StoreError> {
    save_config_at(&home()?, config)
}
