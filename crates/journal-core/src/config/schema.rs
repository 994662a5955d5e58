use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of background processing workers when none is configured.
pub const DEFAULT_WORKER_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// Thumbnail output directory, relative to `media_root`.
    #[serde(default = "default_thumbnail_directory")]
    pub thumbnail_directory: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Longest edge of generated thumbnails, in pixels.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Absolute directory thumbnails are written to.
    pub fn thumbnail_root(&self) -> PathBuf {
        self.media_root.join(&self.thumbnail_directory)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: default_database_path(),
            media_root: default_media_root(),
            thumbnail_directory: default_thumbnail_directory(),
            worker_count: default_worker_count(),
            thumbnail_size: default_thumbnail_size(),
            max_upload_bytes: default_max_upload_bytes(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn journal_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".journal")
}

fn default_database_path() -> PathBuf {
    crate::db::default_database_path().unwrap_or_else(|| journal_home().join("journal.db"))
}

fn default_media_root() -> PathBuf {
    journal_home().join("media")
}

fn default_thumbnail_directory() -> String {
    "thumbnails".to_string()
}

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

fn default_thumbnail_size() -> u32 {
    256
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}
