use crate::core::types::DEFAULT_SOURCE_PLACEHOLDER;
use serde::{Deserialize, Serialize};

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

/// Stage configuration loaded from stylestream.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StageConfig {
    /// Stage configuration
    #[serde(default)]
    pub stage: StageSection,

    /// Source map configuration
    #[serde(default)]
    pub source_map: SourceMapSection,
}

/// `[stage]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageSection {
    /// Name used for `from`/`to` when a file carries no path
    #[serde(default = "default_source")]
    pub default_source: String,

    /// Bound of the duplex stream's input and output queues
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Declarative plugin chain, resolved through a plugin registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<toml::Value>,
}

/// `[source_map]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceMapSection {
    /// Append an inline sourceMappingURL comment to mapped files
    #[serde(default = "default_annotate")]
    pub annotate: bool,
}

impl Default for StageSection {
    fn default() -> Self {
        Self {
            default_source: default_source(),
            channel_capacity: default_channel_capacity(),
            plugins: None,
        }
    }
}

impl Default for SourceMapSection {
    fn default() -> Self {
        Self {
            annotate: default_annotate(),
        }
    }
}

// Default functions
fn default_source() -> String {
    DEFAULT_SOURCE_PLACEHOLDER.to_string()
}

fn default_channel_capacity() -> usize {
    16
}

fn default_annotate() -> bool {
    true
}
