//! Subcommands and the setup they share.

pub mod add;
pub mod config;
pub mod export;
pub mod pages;
pub mod workspace;

use std::path::{Path, PathBuf};

use tracing::debug;

use rpdf_core::{RpdfConfig, WorkspaceManager};

/// Options accepted by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Globals<'a> {
    pub config: Option<&'a Path>,
    pub data_dir: Option<&'a Path>,
}

impl Globals<'_> {
    /// Config file in use: `--config`, else the per-user default.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path)
    }

    /// Load the configuration, applying `--data-dir`.
    ///
    /// An explicit `--config` must exist; the default file is optional.
    pub fn load_config(&self) -> anyhow::Result<RpdfConfig> {
        let mut config = match self.config {
            Some(path) => RpdfConfig::from_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    RpdfConfig::from_file(&path)?
                } else {
                    RpdfConfig::default()
                }
            }
        };

        if let Some(data_dir) = self.data_dir {
            config.storage.data_dir = data_dir.to_path_buf();
        }
        debug!("Using data directory {}", config.storage.data_dir.display());
        Ok(config)
    }

    pub fn open_manager(&self) -> anyhow::Result<(RpdfConfig, WorkspaceManager)> {
        let config = self.load_config()?;
        let manager = WorkspaceManager::open(&config);
        Ok((config, manager))
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rpdf")
        .join("config.json")
}

/// Convert a 1-based position from the command line to an index.
pub fn to_index(position: usize) -> anyhow::Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| anyhow::anyhow!("Positions start at 1"))
}
