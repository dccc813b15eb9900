pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod file;
pub mod sourcemap;
pub mod stage;
pub mod stream;
pub mod types;

pub use chain::{Mutation, Plugin, PluginChain, PluginRegistry, Processor};
pub use config::{ConfigLoader, StageConfig};
pub use engine::{DocumentEngine, ProcessOptions, Rendered, TransformResult};
pub use error::{EngineError, PipelineError};
pub use file::{FileContents, FileObject};
pub use stage::{StageSettings, TracingWarningSink, TransformStage, WarningSink};
pub use stream::{DuplexStream, StreamAdapter, StreamState};
pub use types::*;
