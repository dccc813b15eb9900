use super::{decode, Mapping, OriginalPosition, SourceMapBuilder, SourceMapError};
use std::collections::HashMap;
use stylestream_types::SourceMap;

/// Chain `generated` (output → intermediate) onto `upstream`
/// (intermediate → original) so the result points at the original sources.
///
/// An upstream map without mappings only marks the file as tracked; in that
/// case `generated` is returned as is, borrowing upstream `sourcesContent`.
/// Otherwise each generated mapping into the upstream file is traced through
/// the upstream segment at the greatest column not past it on the same line.
/// Mappings that cannot be traced keep their intermediate position.
pub fn compose(generated: &SourceMap, upstream: &SourceMap) -> Result<SourceMap, SourceMapError> {
    if !upstream.has_mappings() {
        let mut composed = generated.clone();
        if composed.sources_content.iter().all(Option::is_none) {
            let contents: Vec<Option<String>> = composed
                .sources
                .iter()
                .map(|source| upstream.content_for(source).map(str::to_string))
                .collect();
            if contents.iter().any(Option::is_some) {
                composed.sources_content = contents;
            }
        }
        return Ok(composed);
    }

    let upstream_mappings = decode(upstream)?;
    let mut by_line: HashMap<u32, Vec<&Mapping>> = HashMap::new();
    for mapping in &upstream_mappings {
        by_line
            .entry(mapping.generated_line)
            .or_default()
            .push(mapping);
    }
    for segments in by_line.values_mut() {
        segments.sort_by_key(|mapping| mapping.generated_column);
    }

    let target = upstream.file.as_deref();
    let mut builder = SourceMapBuilder::new(generated.file.as_deref());
    for mapping in decode(generated)? {
        let original = match mapping.original {
            Some(original) if target.map_or(true, |file| file == original.source) => {
                Some(trace(&by_line, original))
            }
            other => other,
        };
        builder.add_mapping(Mapping {
            generated_line: mapping.generated_line,
            generated_column: mapping.generated_column,
            original,
        });
    }

    let sources = builder.sources.clone();
    for source in sources {
        let content = upstream
            .content_for(&source)
            .or_else(|| generated.content_for(&source))
            .map(str::to_string);
        builder.set_source_content(&source, content);
    }
    Ok(builder.build())
}

fn trace(by_line: &HashMap<u32, Vec<&Mapping>>, position: OriginalPosition) -> OriginalPosition {
    let found = by_line.get(&position.line).and_then(|segments| {
        segments
            .iter()
            .take_while(|segment| segment.generated_column <= position.column)
            .last()
            .and_then(|segment| segment.original.as_ref())
    });
    match found {
        Some(upstream) => OriginalPosition {
            source: upstream.source.clone(),
            line: upstream.line,
            column: upstream.column,
            name: upstream.name.clone().or(position.name),
        },
        None => position,
    }
}
