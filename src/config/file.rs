//! JSON configuration file for the CLI
//!
//! ```json
//! {
//!   "image_path": "./flash.img",
//!   "engine": "blob",
//!   "total_pages": 16,
//!   "page_len": 256,
//!   "full_backup": true
//! }
//! ```
//!
//! Only `image_path` is required.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};
use super::settings::{StorageSettings, DEFAULT_FORMAT_VERSION, DEFAULT_RETRY_COUNT};

/// Which engine owns the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Blob,
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashConfig {
    /// Path of the flash image file (required)
    pub image_path: String,

    #[serde(default = "default_engine")]
    pub engine: EngineKind,

    #[serde(default)]
    pub area_id: u32,

    #[serde(default = "default_total_pages")]
    pub total_pages: u32,

    #[serde(default = "default_page_len")]
    pub page_len: usize,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default)]
    pub full_backup: bool,

    #[serde(default)]
    pub flash_cache: bool,

    #[serde(default)]
    pub write_verify: bool,

    #[serde(default = "default_format_version")]
    pub format_version: u32,
}

fn default_engine() -> EngineKind {
    EngineKind::Blob
}
fn default_total_pages() -> u32 {
    16
}
fn default_page_len() -> usize {
    256
}
fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}
fn default_format_version() -> u32 {
    DEFAULT_FORMAT_VERSION
}

impl FlashConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: FlashConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.image_path.trim().is_empty() {
            return Err(ConfigError::Invalid("image_path must not be empty".into()));
        }
        if self.engine == EngineKind::Blob && self.flash_cache {
            return Err(ConfigError::Invalid(
                "flash_cache is only supported by the log engine".into(),
            ));
        }
        self.settings().validate()
    }

    pub fn image_path(&self) -> &Path {
        Path::new(&self.image_path)
    }

    pub fn settings(&self) -> StorageSettings {
        StorageSettings::new(self.area_id, self.total_pages, self.page_len)
            .with_retry_count(self.retry_count)
            .with_full_backup(self.full_backup)
            .with_flash_cache(self.flash_cache)
            .with_format_version(self.format_version)
    }
}
