//! Build-pipeline stage that runs an ordered chain of stylesheet plugins over
//! a stream of in-memory files and keeps their source maps in step.

pub mod core;
pub mod logging;
pub mod utils;

pub use crate::core::*;
pub use stylestream_types::{SourceMap, Warning};

/// Current crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub type Result<T> = std::result::Result<T, anyhow::Error>;
