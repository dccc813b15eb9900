//! Utility helpers: path arithmetic shared by the stage and the source map code.
pub mod paths;

pub use paths::{normalize, to_unix};
