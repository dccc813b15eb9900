use crate::core::types::{ErrorCategory, PLUGIN_NAME};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Failure reported by a [`crate::core::engine::DocumentEngine`] or a plugin.
///
/// Syntax failures are content errors: they carry their own rendering of the
/// offending source and never warrant a stack trace.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{message}")]
    Syntax { message: String, excerpt: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn syntax<M: Into<String>, E: Into<String>>(message: M, excerpt: E) -> Self {
        EngineError::Syntax {
            message: message.into(),
            excerpt: excerpt.into(),
        }
    }

    /// Lift a plugin failure back into an engine failure, keeping syntax
    /// errors that a plugin raised on purpose.
    pub fn from_plugin(err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(engine) => engine,
            Err(other) => EngineError::Other(other),
        }
    }
}

/// The only error shape that leaves the stage.
#[derive(Debug)]
pub struct PipelineError {
    pub category: ErrorCategory,
    pub plugin: &'static str,
    pub code: String,
    pub message: String,
    /// Set for content errors; hosts must not print a backtrace for these.
    pub suppress_traceback: bool,
    pub file_name: Option<PathBuf>,
    pub occurred_at: DateTime<Utc>,
    pub source: Option<anyhow::Error>,
}

impl PipelineError {
    pub fn new<T: Into<String>>(category: ErrorCategory, message: T) -> Self {
        PipelineError {
            category,
            plugin: PLUGIN_NAME,
            code: format!("{}-001", category.code()),
            message: message.into(),
            suppress_traceback: false,
            file_name: None,
            occurred_at: Utc::now(),
            source: None,
        }
    }

    pub fn configuration<T: Into<String>>(message: T) -> Self {
        PipelineError::new(ErrorCategory::ConfigurationError, message)
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        PipelineError::new(ErrorCategory::InternalError, message)
    }

    /// Content error whose message is the engine's message followed by its
    /// rendering of the offending source.
    pub fn syntax(message: &str, excerpt: &str) -> Self {
        let mut error = PipelineError::new(
            ErrorCategory::ContentSyntaxError,
            format!("{}{}", message, excerpt),
        );
        error.suppress_traceback = true;
        error
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        self.file_name = path.map(|path| path.as_ref().to_path_buf());
        self
    }

    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_content_error(&self) -> bool {
        self.category == ErrorCategory::ContentSyntaxError
    }

    /// Text a host should print. The cause chain, and the backtrace when one
    /// was captured, is only included for errors that do not suppress it.
    pub fn render(&self) -> String {
        let mut rendered = format!("Error in plugin '{}'", self.plugin);
        if let Some(file_name) = &self.file_name {
            rendered.push_str(&format!("\nFile: {}", file_name.display()));
        }
        rendered.push_str(&format!("\nMessage:\n    {}", self.message));
        if !self.suppress_traceback {
            if let Some(source) = &self.source {
                rendered.push_str(&format!("\nDetails:\n{:?}", source));
            }
        }
        rendered
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.plugin, self.message)?;
        if let Some(file_name) = &self.file_name {
            write!(f, " ({})", file_name.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|source| {
            let err: &(dyn std::error::Error + 'static) = source.as_ref();
            err
        })
    }
}

impl From<EngineError> for PipelineError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Syntax { message, excerpt } => PipelineError::syntax(&message, &excerpt),
            EngineError::Other(source) => {
                PipelineError::internal(source.to_string()).with_source(source)
            }
        }
    }
}
