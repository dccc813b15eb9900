#![allow(clippy::result_large_err)]

use super::{ConfigValidator, StageConfig};
use crate::core::error::PipelineError;
use std::env;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "stylestream.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from project root (root/stylestream.toml)
    /// Environment variables override config file values
    /// Falls back to defaults + env vars when the file doesn't exist
    pub fn load_from_dir(root: &Path) -> Result<StageConfig, PipelineError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut config);

        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<StageConfig>, PipelineError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: StageConfig = toml::from_str(&content).map_err(|e| {
            PipelineError::configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    /// Environment variables take precedence over config file values
    fn apply_env_overrides(config: &mut StageConfig) {
        if let Ok(default_source) = env::var("STYLESTREAM_DEFAULT_SOURCE") {
            config.stage.default_source = default_source;
        }

        if let Ok(capacity_str) = env::var("STYLESTREAM_CHANNEL_CAPACITY") {
            if let Ok(capacity) = capacity_str.parse::<usize>() {
                config.stage.channel_capacity = capacity;
            }
        }

        if let Ok(annotate_str) = env::var("STYLESTREAM_SOURCE_MAP_ANNOTATE") {
            if let Ok(annotate) = annotate_str.parse::<bool>() {
                config.source_map.annotate = annotate;
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "STYLESTREAM_DEFAULT_SOURCE - Override the source name used for files without a path (default: <input css>)",
            "STYLESTREAM_CHANNEL_CAPACITY - Override the duplex stream queue bound (default: 16)",
            "STYLESTREAM_SOURCE_MAP_ANNOTATE - Override inline sourceMappingURL comments (true/false, default: true)",
            "STYLESTREAM_LOG_LEVEL - Override logging.default_level",
        ]
    }
}
