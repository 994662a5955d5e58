use std::path::{Component, Path};

use crate::config::schema::Config;
use crate::error::ConfigError;

const SUPPORTED_VERSION: &str = "1.0";
const MAX_WORKER_COUNT: usize = 64;
const THUMBNAIL_SIZE_RANGE: std::ops::RangeInclusive<u32> = 16..=4096;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 || config.worker_count > MAX_WORKER_COUNT {
        return Err(ConfigError::Validation {
            message: format!(
                "worker_count must be between 1 and {}, got {}",
                MAX_WORKER_COUNT, config.worker_count
            ),
        });
    }

    if !THUMBNAIL_SIZE_RANGE.contains(&config.thumbnail_size) {
        return Err(ConfigError::Validation {
            message: format!(
                "thumbnail_size must be between {} and {}, got {}",
                THUMBNAIL_SIZE_RANGE.start(),
                THUMBNAIL_SIZE_RANGE.end(),
                config.thumbnail_size
            ),
        });
    }

    if config.max_upload_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "max_upload_bytes must be greater than zero".to_string(),
        });
    }

    // Thumbnails must land inside the media root.
    let thumbnail_dir = Path::new(&config.thumbnail_directory);
    if config.thumbnail_directory.trim().is_empty()
        || thumbnail_dir.is_absolute()
        || thumbnail_dir
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ConfigError::Validation {
            message: format!(
                "thumbnail_directory must be a relative path inside media_root, got '{}'",
                config.thumbnail_directory
            ),
        });
    }

    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "logging.level cannot be empty".to_string(),
        });
    }

    Ok(())
}
