//! Crash testing utilities
//!
//! - Temp directories holding an image and its config file
//! - Payload files for blob writes

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

pub const PAGE_LEN: usize = 128;

/// A temp directory with a config file pointing at an image inside it
pub struct TestImage {
    dir: TempDir,
    config: PathBuf,
}

impl TestImage {
    pub fn blob(full_backup: bool) -> Self {
        Self::create(json!({
            "engine": "blob",
            "total_pages": 16,
            "page_len": PAGE_LEN,
            "full_backup": full_backup,
            "write_verify": true,
        }))
    }

    pub fn log(full_backup: bool, flash_cache: bool) -> Self {
        Self::create(json!({
            "engine": "log",
            "total_pages": 10,
            "page_len": PAGE_LEN,
            "full_backup": full_backup,
            "flash_cache": flash_cache,
        }))
    }

    fn create(mut config: serde_json::Value) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        config["image_path"] = json!(dir.path().join("flash.img").display().to_string());
        let path = dir.path().join("flashsafe.json");
        fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
        Self { dir, config: path }
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    pub fn image(&self) -> PathBuf {
        self.dir.path().join("flash.img")
    }

    /// Write `bytes` to a file in the temp directory and return its path
    pub fn write_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Deterministic payload of `len` bytes
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_mul(31).wrapping_add(i as u8)).collect()
}
