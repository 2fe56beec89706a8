//! Format constants and runtime configuration
//!
//! The format constants pin down the legacy on-disk layout this crate reads.
//! Runtime configuration is loaded from a TOML file with environment variable
//! overrides.

use crate::error::{TsFileError, TsFileResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Magic bytes opening every TsFile (and repeated at the very end)
pub const MAGIC: [u8; 6] = *b"TsFile";

/// Version string following the head magic
pub const VERSION_NUMBER: [u8; 6] = *b"000002";

/// Bytes occupied by the file header (magic + version)
pub const HEADER_LEN: u64 = (MAGIC.len() + VERSION_NUMBER.len()) as u64;

/// Smallest length a structurally complete file can have:
/// head magic + version + tail magic
pub const MIN_COMPLETE_LEN: u64 = (2 * MAGIC.len() + VERSION_NUMBER.len()) as u64;

/// Runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TsFileConfig {
    /// Width of one time partition in milliseconds. All timestamps in one
    /// file are expected to fall into a single partition bucket.
    #[serde(default = "default_partition_interval_ms")]
    pub partition_interval_ms: i64,

    /// Default directory the CLI resolves relative file names against
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_partition_interval_ms() -> i64 {
    7 * 24 * 3600 * 1000 // one week
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("tsfile").to_string_lossy().to_string())
        .unwrap_or_else(|| "./tsfile_data".to_string())
}

impl Default for TsFileConfig {
    fn default() -> Self {
        Self {
            partition_interval_ms: default_partition_interval_ms(),
            data_dir: default_data_dir(),
        }
    }
}

impl TsFileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> TsFileResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: TsFileConfig = toml::from_str(&content)
            .map_err(|e| TsFileError::Config(format!("invalid config file: {}", e)))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from the default location if present, otherwise fall back to
    /// defaults. Environment overrides apply either way.
    pub fn load_or_default() -> TsFileResult<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(path);
            }
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Default config file location (`<config dir>/tsfile/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tsfile").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) -> TsFileResult<()> {
        if let Ok(value) = std::env::var("TSFILE_PARTITION_INTERVAL_MS") {
            self.partition_interval_ms = value.parse().map_err(|_| {
                TsFileError::Config(format!(
                    "TSFILE_PARTITION_INTERVAL_MS is not a valid integer: {}",
                    value
                ))
            })?;
        }
        if let Ok(value) = std::env::var("TSFILE_DATA_DIR") {
            self.data_dir = value;
        }
        Ok(())
    }
}
