use serde::{Deserialize, Serialize};

/// Identifier stamped on every error and log line produced by this stage.
pub const PLUGIN_NAME: &str = "stylestream";

/// Source path used when a file arrives without one.
pub const DEFAULT_SOURCE_PLACEHOLDER: &str = "<input css>";

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The plugin chain handed to the stage is missing or malformed.
    ConfigurationError,
    /// The file's text does not parse; the message already carries the excerpt.
    ContentSyntaxError,
    /// Anything else raised while running the chain.
    InternalError,
}

impl ErrorCategory {
    /// Stable code prefix used in [`crate::core::error::PipelineError::code`].
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::ConfigurationError => "STS-CONFIG",
            ErrorCategory::ContentSyntaxError => "STS-SYNTAX",
            ErrorCategory::InternalError => "STS-INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
