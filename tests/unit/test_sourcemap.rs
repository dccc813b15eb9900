use stylestream::core::sourcemap::{
    append_annotation, compose, decode, extract_annotation, strip_annotation, SourceMapBuilder,
    SourceMapError,
};
use stylestream_types::SourceMap;

#[test]
fn test_decode_hand_written_mappings() {
    // line 0: col 0 -> a.css 0:0, col 6 -> a.css 0:4 ; line 1: col 2 -> a.css 1:2
    let map = SourceMap {
        sources: vec!["a.css".to_string()],
        mappings: "AAAA,MAAI;EACF".to_string(),
        ..SourceMap::default()
    };
    let decoded = decode(&map).unwrap();
    let positions: Vec<(u32, u32, u32, u32)> = decoded
        .iter()
        .map(|m| {
            let original = m.original.as_ref().unwrap();
            (m.generated_line, m.generated_column, original.line, original.column)
        })
        .collect();
    assert_eq!(positions, vec![(0, 0, 0, 0), (0, 6, 0, 4), (1, 2, 1, 2)]);
}

#[test]
fn test_decode_rejects_malformed_mappings() {
    let bad_digit = SourceMap {
        sources: vec!["a.css".to_string()],
        mappings: "AA!A".to_string(),
        ..SourceMap::default()
    };
    assert!(matches!(decode(&bad_digit), Err(SourceMapError::InvalidDigit('!'))));

    let two_fields = SourceMap {
        sources: vec!["a.css".to_string()],
        mappings: "AA".to_string(),
        ..SourceMap::default()
    };
    assert!(matches!(decode(&two_fields), Err(SourceMapError::FieldCount(2))));
}

#[test]
fn test_builder_output_decodes_to_its_input() {
    let mut builder = SourceMapBuilder::new(Some("out.css"));
    builder.add((3, 1), (0, 0), "b.css", None);
    builder.add((0, 0), (5, 2), "a.css", Some("color"));
    let map = builder.build();
    assert_eq!(map.file.as_deref(), Some("out.css"));

    let decoded = decode(&map).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!((decoded[0].generated_line, decoded[0].generated_column), (0, 0));
    assert_eq!(decoded[0].original.as_ref().unwrap().name.as_deref(), Some("color"));
    assert_eq!(decoded[1].original.as_ref().unwrap().source, "b.css");
}

#[test]
fn test_compose_chains_two_transformations() {
    // original.scss -> intermediate.css: everything on intermediate line 0 comes from line 7
    let mut first = SourceMapBuilder::new(Some("intermediate.css"));
    first.add((0, 0), (7, 0), "original.scss", None);
    first.add((1, 0), (9, 4), "original.scss", None);
    first.set_source_content("original.scss", Some("// scss".to_string()));
    let upstream = first.build();

    // intermediate.css -> output.css
    let mut second = SourceMapBuilder::new(Some("intermediate.css"));
    second.add((0, 0), (1, 0), "intermediate.css", None);
    second.add((0, 8), (0, 3), "intermediate.css", None);
    let generated = second.build();

    let composed = compose(&generated, &upstream).unwrap();
    assert_eq!(composed.sources, vec!["original.scss".to_string()]);
    assert_eq!(composed.content_for("original.scss"), Some("// scss"));

    let decoded = decode(&composed).unwrap();
    let first = decoded[0].original.as_ref().unwrap();
    assert_eq!((first.line, first.column), (9, 4));
    let second = decoded[1].original.as_ref().unwrap();
    assert_eq!((second.line, second.column), (7, 0));
}

#[test]
fn test_compose_leaves_foreign_sources_alone() {
    let mut first = SourceMapBuilder::new(Some("intermediate.css"));
    first.add((0, 0), (4, 0), "original.scss", None);
    let upstream = first.build();

    let mut second = SourceMapBuilder::new(Some("intermediate.css"));
    second.add((0, 0), (2, 2), "vendor.css", None);
    let generated = second.build();

    let composed = compose(&generated, &upstream).unwrap();
    let decoded = decode(&composed).unwrap();
    let original = decoded[0].original.as_ref().unwrap();
    assert_eq!((original.source.as_str(), original.line), ("vendor.css", 2));
}

#[test]
fn test_reprocessing_replaces_the_annotation() {
    let first = SourceMap::identity("fixture.css", Some("a {}".to_string()));
    let annotated = append_annotation("a {}", &first).unwrap();

    let mut builder = SourceMapBuilder::new(Some("fixture.css"));
    builder.add((0, 0), (0, 0), "fixture.css", None);
    let second = builder.build();
    let reannotated = append_annotation(strip_annotation(&annotated), &second).unwrap();

    assert_eq!(reannotated.matches("sourceMappingURL").count(), 1);
    assert!(reannotated.starts_with("a {}\n/*# sourceMappingURL="));
    assert_eq!(extract_annotation(&reannotated), Some(second));
}

#[test]
fn test_text_without_annotation_is_untouched() {
    assert_eq!(strip_annotation("a { color: black }\n"), "a { color: black }\n");
    assert_eq!(extract_annotation("a { color: black }"), None);
}
