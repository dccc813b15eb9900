use super::{Plugin, Processor};
use crate::core::error::PipelineError;
use std::collections::HashMap;
use std::sync::Arc;
use toml::Value;

/// Builds a plugin from the options table it was declared with.
pub type PluginFactory<D> = Arc<dyn Fn(&Value) -> anyhow::Result<Plugin<D>> + Send + Sync>;

/// Builder used to register plugin factories before chains are resolved.
pub struct PluginRegistryBuilder<D: Send + 'static> {
    factories: HashMap<String, PluginFactory<D>>,
}

impl<D: Send + 'static> Default for PluginRegistryBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Send + 'static> PluginRegistryBuilder<D> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<N, F>(&mut self, name: N, factory: F) -> Result<&mut Self, PipelineError>
    where
        N: Into<String>,
        F: Fn(&Value) -> anyhow::Result<Plugin<D>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(PipelineError::configuration(format!(
                "duplicate plugin registered: {}",
                name
            )));
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(self)
    }

    pub fn build(self) -> PluginRegistry<D> {
        PluginRegistry {
            inner: Arc::new(self.factories),
        }
    }
}

/// Immutable name → factory table used to resolve declarative chains.
pub struct PluginRegistry<D: Send + 'static> {
    inner: Arc<HashMap<String, PluginFactory<D>>>,
}

impl<D: Send + 'static> Clone for PluginRegistry<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Send + 'static> Default for PluginRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Send + 'static> PluginRegistry<D> {
    pub fn new() -> Self {
        PluginRegistryBuilder::new().build()
    }

    pub fn builder() -> PluginRegistryBuilder<D> {
        PluginRegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<PluginFactory<D>> {
        self.inner.get(name).cloned()
    }

    /// Resolve a declared chain. `value` must be an array whose entries are a
    /// plugin name, a `{ name, options }` table, or a nested array that becomes
    /// a pre-built [`Processor`].
    pub fn resolve_chain(&self, value: &Value) -> Result<Vec<Plugin<D>>, PipelineError> {
        match value {
            Value::Array(entries) => entries
                .iter()
                .map(|entry| self.resolve_entry(entry))
                .collect(),
            other => Err(PipelineError::configuration(format!(
                "Please provide array of plugins! (got {})",
                other.type_str()
            ))),
        }
    }

    fn resolve_entry(&self, entry: &Value) -> Result<Plugin<D>, PipelineError> {
        match entry {
            Value::String(name) => self.instantiate(name, &Value::Table(toml::map::Map::new())),
            Value::Table(table) => {
                let name = table.get("name").and_then(Value::as_str).ok_or_else(|| {
                    PipelineError::configuration("plugin entry is missing a string `name`")
                })?;
                let options = table
                    .get("options")
                    .cloned()
                    .unwrap_or_else(|| Value::Table(toml::map::Map::new()));
                self.instantiate(name, &options)
            }
            Value::Array(nested) => {
                let mut processor = Processor::new();
                for item in nested {
                    processor = processor.use_plugin(self.resolve_entry(item)?);
                }
                Ok(Plugin::Processor(processor))
            }
            other => Err(PipelineError::configuration(format!(
                "unsupported plugin entry of type {}",
                other.type_str()
            ))),
        }
    }

    fn instantiate(&self, name: &str, options: &Value) -> Result<Plugin<D>, PipelineError> {
        let factory = self
            .get(name)
            .ok_or_else(|| PipelineError::configuration(format!("unknown plugin '{}'", name)))?;
        factory(options).map_err(|err| {
            PipelineError::configuration(format!("plugin '{}' rejected its options: {}", name, err))
                .with_source(err)
        })
    }
}
