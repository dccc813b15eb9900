//! Ordered plugin chains and the two kinds of plugin they hold.

use crate::core::engine::{DocumentEngine, ProcessOptions, TransformResult};
use crate::core::error::{EngineError, PipelineError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::sync::Arc;
use stylestream_types::Warning;

mod registry;

pub use registry::{PluginFactory, PluginRegistry, PluginRegistryBuilder};

/// A single rewriting step over a document tree.
#[async_trait]
pub trait Mutation<D: Send + 'static>: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Rewrite `document` in place, pushing any diagnostics onto `warnings`.
    async fn apply(&self, document: &mut D, warnings: &mut Vec<Warning>) -> anyhow::Result<()>;
}

struct SyncMutation<F> {
    name: String,
    func: F,
}

#[async_trait]
impl<D, F> Mutation<D> for SyncMutation<F>
where
    D: Send + 'static,
    F: Fn(&mut D, &mut Vec<Warning>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, document: &mut D, warnings: &mut Vec<Warning>) -> anyhow::Result<()> {
        (self.func)(document, warnings)
    }
}

struct AsyncMutation<F> {
    name: String,
    func: F,
}

#[async_trait]
impl<D, F> Mutation<D> for AsyncMutation<F>
where
    D: Send + 'static,
    F: for<'a> Fn(&'a mut D, &'a mut Vec<Warning>) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, document: &mut D, warnings: &mut Vec<Warning>) -> anyhow::Result<()> {
        (self.func)(document, warnings).await
    }
}

/// One element of a chain: a bare mutation, or a processor that was assembled
/// ahead of time and carries its own chain.
pub enum Plugin<D: Send + 'static> {
    Mutation(Arc<dyn Mutation<D>>),
    Processor(Processor<D>),
}

impl<D: Send + 'static> Plugin<D> {
    pub fn mutation<M: Mutation<D>>(mutation: M) -> Self {
        Plugin::Mutation(Arc::new(mutation))
    }

    /// Wrap a function that finishes before returning.
    pub fn sync<N, F>(name: N, func: F) -> Self
    where
        N: Into<String>,
        F: Fn(&mut D, &mut Vec<Warning>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Plugin::mutation(SyncMutation {
            name: name.into(),
            func,
        })
    }

    /// Wrap a function whose work completes later.
    pub fn from_async<N, F>(name: N, func: F) -> Self
    where
        N: Into<String>,
        F: for<'a> Fn(&'a mut D, &'a mut Vec<Warning>) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Plugin::mutation(AsyncMutation {
            name: name.into(),
            func,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Plugin::Mutation(mutation) => mutation.name(),
            Plugin::Processor(_) => "processor",
        }
    }

    /// Run this plugin to completion against `document`.
    pub fn apply<'a>(
        &'a self,
        document: &'a mut D,
        warnings: &'a mut Vec<Warning>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        match self {
            Plugin::Mutation(mutation) => mutation.apply(document, warnings),
            Plugin::Processor(processor) => processor.run(document, warnings).boxed(),
        }
    }
}

impl<D: Send + 'static> Clone for Plugin<D> {
    fn clone(&self) -> Self {
        match self {
            Plugin::Mutation(mutation) => Plugin::Mutation(Arc::clone(mutation)),
            Plugin::Processor(processor) => Plugin::Processor(processor.clone()),
        }
    }
}

impl<D: Send + 'static> fmt::Debug for Plugin<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plugin::Mutation(mutation) => f.debug_tuple("Mutation").field(&mutation.name()).finish(),
            Plugin::Processor(processor) => f.debug_tuple("Processor").field(processor).finish(),
        }
    }
}

impl<D: Send + 'static> From<Processor<D>> for Plugin<D> {
    fn from(processor: Processor<D>) -> Self {
        Plugin::Processor(processor)
    }
}

/// Pre-configured processor. Unlike [`PluginChain`] it may be empty while it
/// is being assembled; an empty processor is a no-op step.
pub struct Processor<D: Send + 'static> {
    plugins: Vec<Plugin<D>>,
}

impl<D: Send + 'static> Default for Processor<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Send + 'static> Processor<D> {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Append a plugin to the end of this processor's chain.
    pub fn use_plugin<P: Into<Plugin<D>>>(mut self, plugin: P) -> Self {
        self.plugins.push(plugin.into());
        self
    }

    pub fn plugins(&self) -> &[Plugin<D>] {
        &self.plugins
    }

    pub async fn run(&self, document: &mut D, warnings: &mut Vec<Warning>) -> anyhow::Result<()> {
        for plugin in &self.plugins {
            plugin.apply(document, warnings).await?;
        }
        Ok(())
    }
}

impl<D: Send + 'static> Clone for Processor<D> {
    fn clone(&self) -> Self {
        Self {
            plugins: self.plugins.clone(),
        }
    }
}

impl<D: Send + 'static> fmt::Debug for Processor<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.plugins.iter()).finish()
    }
}

/// Validated, immutable, non-empty chain shared by every file of a stream.
pub struct PluginChain<D: Send + 'static> {
    plugins: Arc<[Plugin<D>]>,
}

impl<D: Send + 'static> PluginChain<D> {
    pub fn new(plugins: Vec<Plugin<D>>) -> Result<Self, PipelineError> {
        if plugins.is_empty() {
            return Err(missing_plugins());
        }
        Ok(Self {
            plugins: plugins.into(),
        })
    }

    /// Same as [`PluginChain::new`] but also rejects an absent list.
    pub fn try_from_option(plugins: Option<Vec<Plugin<D>>>) -> Result<Self, PipelineError> {
        match plugins {
            Some(plugins) => Self::new(plugins),
            None => Err(missing_plugins()),
        }
    }

    /// Build a chain from its declarative form, resolving names through
    /// `registry`. See [`PluginRegistry::resolve_chain`].
    pub fn from_config(
        value: &toml::Value,
        registry: &PluginRegistry<D>,
    ) -> Result<Self, PipelineError> {
        Self::new(registry.resolve_chain(value)?)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn plugins(&self) -> &[Plugin<D>] {
        &self.plugins
    }

    /// Apply every plugin in declared order, awaiting each before the next.
    pub async fn apply(&self, document: &mut D, warnings: &mut Vec<Warning>) -> anyhow::Result<()> {
        for plugin in self.plugins.iter() {
            tracing::trace!(plugin = plugin.name(), "applying plugin");
            plugin.apply(document, warnings).await?;
        }
        Ok(())
    }

    /// Parse `text` with `engine`, run the chain, and serialize the result.
    pub async fn process<E>(
        &self,
        engine: &E,
        text: &str,
        options: &ProcessOptions,
    ) -> Result<TransformResult, EngineError>
    where
        E: DocumentEngine<Document = D>,
    {
        let mut document = engine.parse(text, options)?;
        let mut warnings = Vec::new();
        self.apply(&mut document, &mut warnings)
            .await
            .map_err(EngineError::from_plugin)?;
        let rendered = engine.stringify(&document, options)?;
        Ok(TransformResult {
            text: rendered.text,
            map: rendered.map,
            warnings,
        })
    }
}

impl<D: Send + 'static> Clone for PluginChain<D> {
    fn clone(&self) -> Self {
        Self {
            plugins: Arc::clone(&self.plugins),
        }
    }
}

impl<D: Send + 'static> fmt::Debug for PluginChain<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.plugins.iter()).finish()
    }
}

fn missing_plugins() -> PipelineError {
    PipelineError::configuration("Please provide array of plugins!")
}
