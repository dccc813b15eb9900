//! Boundary to the parser/serializer that owns the document format.
//!
//! The stage never looks inside a document: an engine turns text into a
//! mutable tree, the plugin chain rewrites that tree, and the engine turns it
//! back into text (and, when asked, a source map whose sources are the `from`
//! path it was handed).

use crate::core::error::EngineError;
use stylestream_types::{SourceMap, Warning};

/// Options derived for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    pub from: String,
    pub to: String,
    /// Whether the engine should generate a source map.
    pub map: bool,
}

impl ProcessOptions {
    pub fn new<T: Into<String>>(from: T, map: bool) -> Self {
        let from = from.into();
        Self {
            to: from.clone(),
            from,
            map,
        }
    }
}

/// Serialized document returned by [`DocumentEngine::stringify`].
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub text: String,
    pub map: Option<SourceMap>,
}

/// Outcome of one successful run of the chain over one text.
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub text: String,
    pub map: Option<SourceMap>,
    pub warnings: Vec<Warning>,
}

/// Parser/serializer pair for the document format.
pub trait DocumentEngine: Send + Sync + 'static {
    type Document: Send + 'static;

    /// Parse `text`. Grammar violations must be reported as
    /// [`EngineError::Syntax`] so they reach the user without a backtrace.
    fn parse(&self, text: &str, options: &ProcessOptions) -> Result<Self::Document, EngineError>;

    /// Serialize `document`, generating a map when `options.map` is set.
    fn stringify(
        &self,
        document: &Self::Document,
        options: &ProcessOptions,
    ) -> Result<Rendered, EngineError>;
}
