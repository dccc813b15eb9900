//! Plain data shared between the transform stage and the engines that plug into it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Revision 3 source map, in its JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_content: Vec<Option<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub mappings: String,
}

impl SourceMap {
    /// Map with no mappings for a single source, the shape a pipeline produces
    /// when it starts tracking a file that has not been transformed yet.
    pub fn identity<S: Into<String>>(source: S, content: Option<String>) -> Self {
        let source = source.into();
        Self {
            version: 3,
            file: Some(source.clone()),
            source_root: None,
            sources: vec![source],
            sources_content: vec![content],
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    pub fn has_mappings(&self) -> bool {
        !self.mappings.is_empty()
    }

    /// Embedded content for `source`, if the map carries it.
    pub fn content_for(&self, source: &str) -> Option<&str> {
        let index = self.sources.iter().position(|candidate| candidate == source)?;
        self.sources_content
            .get(index)
            .and_then(|content| content.as_deref())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self {
            version: 3,
            file: None,
            source_root: None,
            sources: Vec::new(),
            sources_content: Vec::new(),
            names: Vec::new(),
            mappings: String::new(),
        }
    }
}

/// Non-fatal diagnostic raised by a plugin while it rewrites a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Warning {
    pub fn new<T: Into<String>>(text: T) -> Self {
        Self {
            text: text.into(),
            plugin: None,
            line: None,
            column: None,
        }
    }

    pub fn with_plugin<T: Into<String>>(mut self, plugin: T) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(plugin) = &self.plugin {
            write!(f, "{}: ", plugin)?;
        }
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, "{}:{}: ", line, column)?;
        }
        write!(f, "{}", self.text)
    }
}
