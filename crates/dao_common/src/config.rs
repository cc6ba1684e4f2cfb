//! Tracker configuration
//!
//! Where the collection blobs live. Resolution order:
//! 1. `DAOTRACK_DATA_DIR` environment variable
//! 2. `data_dir` in `~/.config/daotrack/config.toml`
//! 3. `dirs::data_local_dir()/daotrack`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "DAOTRACK_DATA_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Directory holding the collection blobs.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl TrackerConfig {
    /// Config file path, `~/.config/daotrack/config.toml`.
    pub fn config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("daotrack").join("config.toml"))
    }

    /// Load the config file; missing file means defaults, an
    /// unparseable file is warned about and ignored.
    pub fn load() -> Self {
        let Some(path) = Self::config_file() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring unparseable config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Resolve the effective data directory.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("daotrack")
    }
}
