//! Configuration structures for rpdf.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for rpdf.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RpdfConfig {
    /// Storage configuration.
    pub storage: StorageConfig,

    /// Thumbnail rendering configuration.
    pub thumbnails: ThumbnailConfig,

    /// Defaults for new workspaces.
    pub workspace: WorkspaceDefaults,
}

/// Where persisted state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the filesystem key-value store.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".rpdf"),
        }
    }
}

/// Thumbnail sizes, in pixels along the longer side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Size of the grid thumbnails generated on load.
    pub max_size: u32,

    /// Default size for single page image exports.
    pub export_size: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_size: 200,
            export_size: 1200,
        }
    }
}

/// Metadata used for workspaces that have none saved yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceDefaults {
    /// Display name.
    pub default_name: String,

    /// File name proposed when exporting.
    pub default_export_file_name: String,
}

impl Default for WorkspaceDefaults {
    fn default() -> Self {
        Self {
            default_name: "New workspace".to_string(),
            default_export_file_name: "reactive-pdf-export.pdf".to_string(),
        }
    }
}

impl RpdfConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
