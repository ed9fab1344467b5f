use anyhow::{Context, Result};
use declarative::SystemDatabase;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Name of the optional config file inside the config directory
pub const CONFIG_FILE: &str = "stead.toml";

// ============================================================================
// stead.toml
// ============================================================================

/// Where the "requires --force" status line goes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusChannel {
    /// File descriptor 3, when the caller opened it
    #[default]
    Fd3,
    Stderr,
    None,
    /// Append to a file
    File(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub definitions_dir: Option<String>,
    pub registry_path: Option<String>,
    pub status: StatusChannel,
}

impl Config {
    /// Load `stead.toml` from `dir`, or the defaults when it does not exist
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid {} format", path.display()))
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

/// Every location one run needs, resolved against the root directory
#[derive(Debug)]
pub struct Settings {
    pub root: PathBuf,
    pub database: SystemDatabase,
    pub definitions_dir: PathBuf,
    pub registry_path: PathBuf,
    pub status: StatusChannel,
}

impl Settings {
    /// Resolve settings from the environment and `stead.toml`
    pub fn resolve() -> Result<Self> {
        let root = paths::root_dir();
        let config = Config::load(&paths::config_dir(&root))?;
        Ok(Self::from_config(root, config))
    }

    pub fn from_config(root: PathBuf, config: Config) -> Self {
        let definitions_dir = paths::definitions_dir(&root, config.definitions_dir.as_deref());
        let registry_path = paths::registry_path(&root, config.registry_path.as_deref());
        let status = match config.status {
            StatusChannel::File(path) => {
                let path = paths::under_root(&root, &paths::expand(&path));
                StatusChannel::File(path.display().to_string())
            }
            other => other,
        };

        Self {
            database: SystemDatabase::under_root(&root),
            root,
            definitions_dir,
            registry_path,
            status,
        }
    }
}
