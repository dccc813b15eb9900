#![allow(clippy::result_large_err)]

use crate::core::chain::PluginChain;
use crate::core::config::StageConfig;
use crate::core::engine::{DocumentEngine, ProcessOptions};
use crate::core::error::PipelineError;
use crate::core::file::{FileContents, FileObject};
use crate::core::sourcemap::{append_annotation, compose, strip_annotation};
use crate::core::types::{DEFAULT_SOURCE_PLACEHOLDER, PLUGIN_NAME};
use crate::utils::paths::{normalize, to_unix};
use std::path::Path;
use std::sync::Arc;
use stylestream_types::{SourceMap, Warning};

/// Receives the per-file warning summary. Observational only.
pub trait WarningSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Default sink: one `tracing` warning event per file.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarningSink;

impl WarningSink for TracingWarningSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Knobs that shape how a file is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSettings {
    /// Source name used when a file has no path.
    pub default_source: String,
    /// Append an inline `sourceMappingURL` comment when a map is tracked.
    pub annotate_source_map: bool,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            default_source: DEFAULT_SOURCE_PLACEHOLDER.to_string(),
            annotate_source_map: true,
        }
    }
}

impl From<&StageConfig> for StageSettings {
    fn from(config: &StageConfig) -> Self {
        Self {
            default_source: config.stage.default_source.clone(),
            annotate_source_map: config.source_map.annotate,
        }
    }
}

/// Runs the plugin chain over one file at a time.
pub struct TransformStage<E: DocumentEngine> {
    engine: Arc<E>,
    chain: PluginChain<E::Document>,
    sink: Arc<dyn WarningSink>,
    settings: StageSettings,
}

impl<E: DocumentEngine> TransformStage<E> {
    pub fn new(engine: E, chain: PluginChain<E::Document>) -> Self {
        Self::with_shared_engine(Arc::new(engine), chain)
    }

    pub fn with_shared_engine(engine: Arc<E>, chain: PluginChain<E::Document>) -> Self {
        Self {
            engine,
            chain,
            sink: Arc::new(TracingWarningSink),
            settings: StageSettings::default(),
        }
    }

    pub fn with_warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_settings(mut self, settings: StageSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn chain(&self) -> &PluginChain<E::Document> {
        &self.chain
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    /// `from`/`to` are the file's path (or the placeholder); a map is only
    /// generated when the file already tracks one.
    pub fn options_for(&self, file: &FileObject) -> ProcessOptions {
        let from = file
            .path
            .as_deref()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.settings.default_source.clone());
        ProcessOptions::new(from, file.source_map.is_some())
    }

    /// Transform one file. Exactly one of the returned file or the error is
    /// produced; files without contents come back untouched.
    pub async fn transform(&self, mut file: FileObject) -> Result<FileObject, PipelineError> {
        let text = match std::mem::take(&mut file.contents) {
            FileContents::Null => {
                tracing::debug!(path = ?file.path, "passing through file without contents");
                return Ok(file);
            }
            FileContents::Stream(_) => {
                return Err(PipelineError::internal("Streams are not supported!")
                    .with_code("STS-INTERNAL-002")
                    .with_file(file.path.as_ref()));
            }
            FileContents::Buffer(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => {
                    return Err(PipelineError::internal(format!(
                        "file contents are not valid UTF-8: {}",
                        err
                    ))
                    .with_code("STS-INTERNAL-003")
                    .with_file(file.path.as_ref()));
                }
            },
        };

        let options = self.options_for(&file);
        tracing::debug!(from = %options.from, map = options.map, "transforming file");

        // Only an inline map from an earlier pass is replaced; unmapped text is left alone.
        let input = if options.map {
            strip_annotation(&text)
        } else {
            text.as_str()
        };
        let result = match self.chain.process(self.engine.as_ref(), input, &options).await {
            Ok(result) => result,
            Err(err) => {
                let error = PipelineError::from(err).with_file(file.path.as_ref());
                tracing::debug!(code = %error.code, from = %options.from, "transform failed");
                return Err(error);
            }
        };

        self.report_warnings(&options, &result.warnings);

        let source_map = match file.source_map.take() {
            Some(upstream) if options.map => {
                Some(self.merge_source_map(&file, &options, upstream, result.map)?)
            }
            other => other,
        };

        let text = match &source_map {
            Some(map) if self.settings.annotate_source_map => append_annotation(&result.text, map)
                .map_err(|err| {
                    PipelineError::internal(err.to_string())
                        .with_code("STS-INTERNAL-004")
                        .with_file(file.path.as_ref())
                })?,
            _ => result.text,
        };

        Ok(FileObject {
            path: file.path,
            base: file.base,
            contents: FileContents::Buffer(text.into_bytes()),
            source_map,
        })
    }

    fn report_warnings(&self, options: &ProcessOptions, warnings: &[Warning]) {
        if warnings.is_empty() {
            return;
        }
        let rendered: Vec<String> = warnings.iter().map(ToString::to_string).collect();
        self.sink.warn(&format!(
            "{}: {}\n{}",
            PLUGIN_NAME,
            options.from,
            rendered.join("\n")
        ));
    }

    /// Rewrite the generated map's names relative to the file's base and
    /// chain it onto the map the file arrived with.
    fn merge_source_map(
        &self,
        file: &FileObject,
        options: &ProcessOptions,
        upstream: SourceMap,
        generated: Option<SourceMap>,
    ) -> Result<SourceMap, PipelineError> {
        let mut generated = generated.ok_or_else(|| {
            PipelineError::internal("engine did not produce a source map for a mapped file")
                .with_code("STS-INTERNAL-005")
                .with_file(file.path.as_ref())
        })?;

        let base = file.base_dir();
        generated.file = Some(file.relative().unwrap_or_else(|| options.to.clone()));
        generated.sources = generated
            .sources
            .iter()
            .map(|source| relative_source(base, source))
            .collect();

        compose(&generated, &upstream).map_err(|err| {
            PipelineError::internal(format!("failed to apply source map: {}", err))
                .with_code("STS-INTERNAL-006")
                .with_file(file.path.as_ref())
        })
    }
}

fn relative_source(base: Option<&Path>, source: &str) -> String {
    let path = Path::new(source);
    match base {
        Some(base) if path.is_absolute() => {
            match pathdiff::diff_paths(normalize(path), normalize(base)) {
                Some(relative) => to_unix(&relative),
                None => to_unix(&normalize(path)),
            }
        }
        _ => to_unix(&normalize(path)),
    }
}
