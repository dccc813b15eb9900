#![allow(clippy::result_large_err)]

use super::StageConfig;
use crate::core::error::PipelineError;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &StageConfig) -> Result<(), PipelineError> {
        if config.stage.default_source.trim().is_empty() {
            return Err(PipelineError::configuration(
                "stage.default_source cannot be empty",
            ));
        }

        // Tokio channels panic on a zero bound
        if config.stage.channel_capacity == 0 {
            return Err(PipelineError::configuration(
                "stage.channel_capacity must be greater than zero",
            ));
        }

        if let Some(plugins) = &config.stage.plugins {
            if !plugins.is_array() {
                return Err(PipelineError::configuration(format!(
                    "stage.plugins must be an array, got {}",
                    plugins.type_str()
                )));
            }
        }

        Ok(())
    }
}
