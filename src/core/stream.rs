//! Stream-facing side of the stage: files in, transformed files out, in the
//! order they arrived, stopping at the first error.

#![allow(clippy::result_large_err)]

use crate::core::chain::{Plugin, PluginChain, PluginRegistry};
use crate::core::config::StageConfig;
use crate::core::engine::DocumentEngine;
use crate::core::error::PipelineError;
use crate::core::file::FileObject;
use crate::core::stage::{StageSettings, TransformStage};
use async_stream::stream;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Lifecycle of a transform stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Receiving,
    Processing,
    Emitting,
    Draining,
    Closed,
    /// Terminal; reached when a file fails to transform.
    Errored,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Closed | StreamState::Errored)
    }
}

/// Adapts a [`TransformStage`] to a stream of files.
pub struct StreamAdapter<E: DocumentEngine> {
    stage: Arc<TransformStage<E>>,
    state: watch::Sender<StreamState>,
    channel_capacity: usize,
}

impl<E: DocumentEngine> StreamAdapter<E> {
    /// Validates the chain up front; an empty list fails here, before any
    /// stream exists.
    pub fn new(engine: E, plugins: Vec<Plugin<E::Document>>) -> Result<Self, PipelineError> {
        let chain = PluginChain::new(plugins)?;
        Ok(Self::from_stage(TransformStage::new(engine, chain)))
    }

    /// Build from configuration, resolving `stage.plugins` through `registry`.
    pub fn from_config(
        engine: E,
        config: &StageConfig,
        registry: &PluginRegistry<E::Document>,
    ) -> Result<Self, PipelineError> {
        let declared = config
            .stage
            .plugins
            .as_ref()
            .ok_or_else(|| PipelineError::configuration("Please provide array of plugins!"))?;
        let chain = PluginChain::from_config(declared, registry)?;
        let stage = TransformStage::new(engine, chain).with_settings(StageSettings::from(config));
        Ok(Self::from_stage(stage).with_channel_capacity(config.stage.channel_capacity))
    }

    pub fn from_stage(stage: TransformStage<E>) -> Self {
        let (state, _) = watch::channel(StreamState::Idle);
        Self {
            stage: Arc::new(stage),
            state,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Bound of both queues of [`StreamAdapter::spawn`]. Values below one are raised to one.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn stage(&self) -> &TransformStage<E> {
        &self.stage
    }

    /// Observe lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Drive `input` through the stage. Files are transformed one at a time;
    /// the returned stream yields each result in arrival order and ends right
    /// after the first error.
    pub fn transform<S>(self, input: S) -> impl Stream<Item = Result<FileObject, PipelineError>> + Send
    where
        S: Stream<Item = FileObject> + Send + 'static,
    {
        let stage = self.stage;
        let state = self.state;
        stream! {
            let mut input = Box::pin(input);
            transition(&state, StreamState::Receiving);
            while let Some(file) = input.next().await {
                transition(&state, StreamState::Processing);
                match stage.transform(file).await {
                    Ok(file) => {
                        transition(&state, StreamState::Emitting);
                        yield Ok(file);
                        transition(&state, StreamState::Receiving);
                    }
                    Err(err) => {
                        tracing::error!(code = %err.code, "{}", err);
                        transition(&state, StreamState::Errored);
                        yield Err(err);
                        return;
                    }
                }
            }
            transition(&state, StreamState::Draining);
            transition(&state, StreamState::Closed);
        }
    }

    /// Run the adapter on a background task and hand back both ends.
    pub fn spawn(self) -> DuplexStream {
        let capacity = self.channel_capacity;
        let (input_tx, input_rx) = mpsc::channel(capacity);
        let (output_tx, output_rx) = mpsc::channel(capacity);
        let state = self.subscribe();

        let task = tokio::spawn(async move {
            let mut output = Box::pin(self.transform(ReceiverStream::new(input_rx)));
            while let Some(item) = output.next().await {
                if output_tx.send(item).await.is_err() {
                    tracing::debug!("reader dropped; stopping transform stream");
                    break;
                }
            }
        });

        DuplexStream {
            writer: Some(input_tx),
            output: ReceiverStream::new(output_rx),
            state,
            task,
        }
    }
}

fn transition(state: &watch::Sender<StreamState>, next: StreamState) {
    let previous = state.send_replace(next);
    tracing::trace!(?previous, ?next, "stream state");
}

/// Writable and readable ends of a spawned [`StreamAdapter`].
pub struct DuplexStream {
    writer: Option<mpsc::Sender<FileObject>>,
    output: ReceiverStream<Result<FileObject, PipelineError>>,
    state: watch::Receiver<StreamState>,
    task: JoinHandle<()>,
}

impl DuplexStream {
    /// Queue a file, waiting while the input queue is full. Fails once the
    /// stream has ended or errored.
    ///
    /// Both queues are bounded by `channel_capacity`. Once the input and output
    /// queues are full this call waits until a result is read, so a host
    /// writing more than about twice that many files must drain the readable
    /// side while it writes. Interleave reads with writes, or feed
    /// [`StreamAdapter::transform`] an input stream instead.
    pub async fn write(&self, file: FileObject) -> Result<(), PipelineError> {
        if self.state().is_terminal() {
            return Err(not_writable());
        }
        let writer = self.writer.as_ref().ok_or_else(not_writable)?;
        writer.send(file).await.map_err(|_| not_writable())
    }

    /// Signal end of input. Files already written are still processed.
    pub fn end(&mut self) {
        self.writer.take();
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Drain everything still to come, stopping after an error.
    pub async fn collect_all(mut self) -> Vec<Result<FileObject, PipelineError>> {
        self.end();
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }

    /// Wait for the background task to finish.
    pub async fn finished(self) -> Result<(), PipelineError> {
        self.task.await.map_err(|err| {
            PipelineError::internal(format!("transform task failed: {}", err))
                .with_source(anyhow::Error::new(err))
        })
    }
}

impl Stream for DuplexStream {
    type Item = Result<FileObject, PipelineError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.output).poll_next(cx)
    }
}

fn not_writable() -> PipelineError {
    PipelineError::internal("stream is no longer accepting files").with_code("STS-INTERNAL-007")
}
