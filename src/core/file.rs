use crate::utils::paths::{normalize, to_unix};
use futures::stream::BoxStream;
use std::fmt;
use std::path::{Path, PathBuf};
use stylestream_types::SourceMap;

/// Streamed file body, as produced by upstream stages that never buffer.
pub type ByteStream = BoxStream<'static, std::io::Result<Vec<u8>>>;

/// Body of a [`FileObject`].
#[derive(Default)]
pub enum FileContents {
    /// Placeholder with nothing to transform, e.g. a directory entry.
    #[default]
    Null,
    Buffer(Vec<u8>),
    Stream(ByteStream),
}

impl fmt::Debug for FileContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileContents::Null => write!(f, "Null"),
            FileContents::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            FileContents::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// A file travelling through the pipeline. `path` and `base` are its identity
/// and are never rewritten by this stage.
#[derive(Debug, Default)]
pub struct FileObject {
    pub path: Option<PathBuf>,
    pub base: Option<PathBuf>,
    pub contents: FileContents,
    pub source_map: Option<SourceMap>,
}

impl FileObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffered file holding `contents`.
    pub fn from_contents<C: Into<Vec<u8>>>(contents: C) -> Self {
        Self {
            contents: FileContents::Buffer(contents.into()),
            ..Self::default()
        }
    }

    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_base<P: Into<PathBuf>>(mut self, base: P) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_contents(mut self, contents: FileContents) -> Self {
        self.contents = contents;
        self
    }

    pub fn with_source_map(mut self, map: SourceMap) -> Self {
        self.source_map = Some(map);
        self
    }

    /// Start tracking a source map for this file, the way a pipeline's
    /// source-map initialisation step does: no mappings yet, the current
    /// contents recorded as the original source.
    pub fn init_source_map(mut self) -> Self {
        let relative = self.relative().unwrap_or_default();
        let content = self
            .contents()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
        self.source_map = Some(SourceMap::identity(relative, content));
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, FileContents::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, FileContents::Stream(_))
    }

    /// Buffered bytes, if the body is buffered.
    pub fn contents(&self) -> Option<&[u8]> {
        match &self.contents {
            FileContents::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Buffered body decoded as UTF-8, if buffered and valid.
    pub fn text(&self) -> Option<&str> {
        self.contents().and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Directory that relative names are computed against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base
            .as_deref()
            .or_else(|| self.path.as_deref().and_then(Path::parent))
    }

    /// Path relative to [`FileObject::base_dir`], with forward slashes.
    pub fn relative(&self) -> Option<String> {
        let path = self.path.as_deref()?;
        let relative = match self.base_dir() {
            Some(base) => pathdiff::diff_paths(normalize(path), normalize(base))
                .unwrap_or_else(|| path.to_path_buf()),
            None => path.to_path_buf(),
        };
        Some(to_unix(&relative))
    }
}
