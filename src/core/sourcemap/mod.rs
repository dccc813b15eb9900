//! Decoding, building, composing and embedding revision 3 source maps.

use base64::Engine as _;
use stylestream_types::SourceMap;

mod compose;
mod vlq;

pub use compose::compose;

const ANNOTATION_PREFIX: &str = "/*# sourceMappingURL=";
const DATA_URL_PREFIX: &str = "data:application/json;base64,";

#[derive(Debug, thiserror::Error)]
pub enum SourceMapError {
    #[error("invalid base64 VLQ digit '{0}' in mappings")]
    InvalidDigit(char),
    #[error("mappings segment '{0}' ends in the middle of a value")]
    Truncated(String),
    #[error("mappings value does not fit in 64 bits")]
    Overflow,
    #[error("mappings segment has {0} fields; expected 1, 4 or 5")]
    FieldCount(usize),
    #[error("mappings reference {kind} index {index} which is out of range")]
    IndexOutOfRange { kind: &'static str, index: i64 },
    #[error("failed to serialize source map: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Position in an original source. Lines and columns are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
}

/// One decoded segment of `mappings`, with indices resolved to values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub original: Option<OriginalPosition>,
}

fn to_u32(value: i64, kind: &'static str) -> Result<u32, SourceMapError> {
    u32::try_from(value).map_err(|_| SourceMapError::IndexOutOfRange { kind, index: value })
}

fn lookup<'a>(items: &'a [String], index: i64, kind: &'static str) -> Result<&'a str, SourceMapError> {
    usize::try_from(index)
        .ok()
        .and_then(|index| items.get(index))
        .map(String::as_str)
        .ok_or(SourceMapError::IndexOutOfRange { kind, index })
}

/// Decode `map.mappings` in generated order.
pub fn decode(map: &SourceMap) -> Result<Vec<Mapping>, SourceMapError> {
    let mut mappings = Vec::new();
    let (mut source, mut line, mut column, mut name) = (0i64, 0i64, 0i64, 0i64);
    for (generated_line, encoded_line) in map.mappings.split(';').enumerate() {
        let generated_line = to_u32(generated_line as i64, "line")?;
        let mut generated_column = 0i64;
        for segment in encoded_line.split(',').filter(|segment| !segment.is_empty()) {
            let fields = vlq::decode_segment(segment)?;
            generated_column += fields[0];
            let original = match fields.len() {
                1 => None,
                4 | 5 => {
                    source += fields[1];
                    line += fields[2];
                    column += fields[3];
                    let name = if fields.len() == 5 {
                        name += fields[4];
                        Some(lookup(&map.names, name, "name")?.to_string())
                    } else {
                        None
                    };
                    Some(OriginalPosition {
                        source: lookup(&map.sources, source, "source")?.to_string(),
                        line: to_u32(line, "line")?,
                        column: to_u32(column, "column")?,
                        name,
                    })
                }
                count => return Err(SourceMapError::FieldCount(count)),
            };
            mappings.push(Mapping {
                generated_line,
                generated_column: to_u32(generated_column, "column")?,
                original,
            });
        }
    }
    Ok(mappings)
}

/// Accumulates mappings and the source/name tables they reference.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    file: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    mappings: Vec<Mapping>,
}

impl SourceMapBuilder {
    pub fn new(file: Option<&str>) -> Self {
        Self {
            file: file.map(str::to_string),
            ..Self::default()
        }
    }

    fn source_index(&mut self, source: &str) -> usize {
        match self.sources.iter().position(|known| known == source) {
            Some(index) => index,
            None => {
                self.sources.push(source.to_string());
                self.sources_content.push(None);
                self.sources.len() - 1
            }
        }
    }

    fn name_index(&mut self, name: &str) -> usize {
        match self.names.iter().position(|known| known == name) {
            Some(index) => index,
            None => {
                self.names.push(name.to_string());
                self.names.len() - 1
            }
        }
    }

    pub fn set_source_content(&mut self, source: &str, content: Option<String>) {
        let index = self.source_index(source);
        self.sources_content[index] = content;
    }

    pub fn add_mapping(&mut self, mapping: Mapping) {
        if let Some(original) = &mapping.original {
            self.source_index(&original.source);
            if let Some(name) = &original.name {
                self.name_index(name);
            }
        }
        self.mappings.push(mapping);
    }

    /// Convenience for the common "this generated position came from here" case.
    pub fn add(
        &mut self,
        generated: (u32, u32),
        original: (u32, u32),
        source: &str,
        name: Option<&str>,
    ) {
        self.add_mapping(Mapping {
            generated_line: generated.0,
            generated_column: generated.1,
            original: Some(OriginalPosition {
                source: source.to_string(),
                line: original.0,
                column: original.1,
                name: name.map(str::to_string),
            }),
        });
    }

    pub fn build(mut self) -> SourceMap {
        self.mappings
            .sort_by_key(|mapping| (mapping.generated_line, mapping.generated_column));
        let mappings = self.encode_mappings();
        let sources_content = if self.sources_content.iter().all(Option::is_none) {
            Vec::new()
        } else {
            self.sources_content
        };
        SourceMap {
            version: 3,
            file: self.file,
            source_root: None,
            sources: self.sources,
            sources_content,
            names: self.names,
            mappings,
        }
    }

    fn encode_mappings(&self) -> String {
        let mut out = String::new();
        let (mut source, mut line, mut column, mut name) = (0i64, 0i64, 0i64, 0i64);
        let mut current_line = 0u32;
        let mut previous_column = 0i64;
        let mut first_in_line = true;
        for mapping in &self.mappings {
            while current_line < mapping.generated_line {
                out.push(';');
                current_line += 1;
                previous_column = 0;
                first_in_line = true;
            }
            if !first_in_line {
                out.push(',');
            }
            first_in_line = false;

            let generated_column = i64::from(mapping.generated_column);
            vlq::encode(generated_column - previous_column, &mut out);
            previous_column = generated_column;

            if let Some(original) = &mapping.original {
                let source_index = self.position(&self.sources, &original.source);
                vlq::encode(source_index - source, &mut out);
                source = source_index;
                vlq::encode(i64::from(original.line) - line, &mut out);
                line = i64::from(original.line);
                vlq::encode(i64::from(original.column) - column, &mut out);
                column = i64::from(original.column);
                if let Some(original_name) = &original.name {
                    let name_index = self.position(&self.names, original_name);
                    vlq::encode(name_index - name, &mut out);
                    name = name_index;
                }
            }
        }
        out
    }

    fn position(&self, table: &[String], value: &str) -> i64 {
        table
            .iter()
            .position(|known| known == value)
            .map(|index| index as i64)
            .unwrap_or_default()
    }
}

/// Remove a trailing inline `sourceMappingURL` data URL comment left by an
/// earlier stage. Comments pointing at external map files are kept.
pub fn strip_annotation(text: &str) -> &str {
    let trimmed = text.trim_end();
    if !trimmed.ends_with("*/") {
        return text;
    }
    match trimmed.rfind(ANNOTATION_PREFIX) {
        Some(start)
            if trimmed[start + ANNOTATION_PREFIX.len()..].starts_with(DATA_URL_PREFIX)
                && !trimmed[start..trimmed.len() - 2].contains("*/") =>
        {
            trimmed[..start].trim_end_matches(['\n', '\r'])
        }
        _ => text,
    }
}

/// Append `map` to `text` as an embedded base64 data URL comment.
pub fn append_annotation(text: &str, map: &SourceMap) -> Result<String, SourceMapError> {
    let json = map.to_json()?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(json.as_bytes());
    let mut annotated = String::with_capacity(text.len() + encoded.len() + 48);
    annotated.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        annotated.push('\n');
    }
    annotated.push_str(ANNOTATION_PREFIX);
    annotated.push_str(DATA_URL_PREFIX);
    annotated.push_str(&encoded);
    annotated.push_str(" */");
    Ok(annotated)
}

/// Read back a map embedded by [`append_annotation`].
pub fn extract_annotation(text: &str) -> Option<SourceMap> {
    let start = text.rfind(ANNOTATION_PREFIX)? + ANNOTATION_PREFIX.len();
    let rest = text[start..].strip_prefix(DATA_URL_PREFIX)?;
    let end = rest.find("*/")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(rest[..end].trim())
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}
