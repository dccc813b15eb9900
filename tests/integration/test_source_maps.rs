#[path = "../support/mod.rs"]
mod support;

use stylestream::core::sourcemap::{decode, extract_annotation, SourceMapBuilder};
use stylestream::{
    DocumentEngine, EngineError, FileObject, Plugin, PluginChain, ProcessOptions, Rendered,
    StageSettings, TransformStage,
};
use support::{doubler, RuleEngine};

/// Engine whose document is the raw text, so trailing comments survive untouched.
struct TextEngine;

impl DocumentEngine for TextEngine {
    type Document = String;

    fn parse(&self, text: &str, _options: &ProcessOptions) -> Result<String, EngineError> {
        Ok(text.to_string())
    }

    fn stringify(&self, text: &String, options: &ProcessOptions) -> Result<Rendered, EngineError> {
        let mut builder = SourceMapBuilder::new(Some(options.to.as_str()));
        builder.add((0, 0), (0, 0), &options.from, None);
        Ok(Rendered {
            text: text.clone(),
            map: options.map.then(|| builder.build()),
        })
    }
}

fn text_stage() -> TransformStage<TextEngine> {
    let noop = Plugin::sync("noop", |_text: &mut String, _warnings| Ok(()));
    TransformStage::new(TextEngine, PluginChain::new(vec![noop]).unwrap())
}

fn stage() -> TransformStage<RuleEngine> {
    TransformStage::new(RuleEngine::new(), PluginChain::new(vec![doubler()]).unwrap())
}

fn mapped_fixture(path: &str, contents: &str) -> FileObject {
    FileObject::from_contents(contents)
        .with_base("/repo/src")
        .with_path(path)
        .init_source_map()
}

#[tokio::test]
async fn test_generated_map_is_relative_to_base() {
    let file = stage()
        .transform(mapped_fixture("/repo/src/fixture.css", "a { color: black }"))
        .await
        .unwrap();

    let map = file.source_map.as_ref().unwrap();
    assert_eq!(map.file.as_deref(), Some("fixture.css"));
    assert_eq!(map.sources, vec!["fixture.css".to_string()]);
    assert_eq!(map.content_for("fixture.css"), Some("a { color: black }"));

    let decoded = decode(map).unwrap();
    let positions: Vec<(u32, u32, u32, u32)> = decoded
        .iter()
        .map(|m| {
            let original = m.original.as_ref().unwrap();
            (m.generated_line, m.generated_column, original.line, original.column)
        })
        .collect();
    assert_eq!(positions, vec![(0, 0, 0, 0), (0, 4, 0, 4), (0, 18, 0, 4)]);
}

#[tokio::test]
async fn test_nested_paths_keep_their_directories() {
    let file = stage()
        .transform(mapped_fixture("/repo/src/css/fixture.css", "a { x: 1 }"))
        .await
        .unwrap();

    let map = file.source_map.unwrap();
    assert_eq!(map.file.as_deref(), Some("css/fixture.css"));
    assert_eq!(map.sources, vec!["css/fixture.css".to_string()]);
}

#[tokio::test]
async fn test_mapped_output_carries_inline_annotation() {
    let file = stage()
        .transform(mapped_fixture("/repo/src/fixture.css", "a { color: black }"))
        .await
        .unwrap();

    let text = file.text().unwrap();
    assert!(text.starts_with("a { color: black; color: black }\n/*# sourceMappingURL="));
    assert_eq!(extract_annotation(text).as_ref(), file.source_map.as_ref());
}

#[tokio::test]
async fn test_annotation_can_be_disabled() {
    let stage = stage().with_settings(StageSettings {
        annotate_source_map: false,
        ..StageSettings::default()
    });
    let file = stage
        .transform(mapped_fixture("/repo/src/fixture.css", "a { color: black }"))
        .await
        .unwrap();

    assert_eq!(file.text(), Some("a { color: black; color: black }"));
    assert!(file.source_map.is_some());
}

#[tokio::test]
async fn test_unmapped_file_gets_no_map() {
    let file = stage()
        .transform(
            FileObject::from_contents("a { color: black }")
                .with_base("/repo/src")
                .with_path("/repo/src/fixture.css"),
        )
        .await
        .unwrap();

    assert!(file.source_map.is_none());
    assert_eq!(file.text(), Some("a { color: black; color: black }"));
}

#[tokio::test]
async fn test_unmapped_file_keeps_external_map_reference() {
    let contents = "a { x: 1 }\n/*# sourceMappingURL=app.css.map */";
    let file = text_stage()
        .transform(
            FileObject::from_contents(contents)
                .with_base("/repo/src")
                .with_path("/repo/src/app.css"),
        )
        .await
        .unwrap();

    assert!(file.source_map.is_none());
    assert_eq!(file.text(), Some(contents));
}

#[tokio::test]
async fn test_mapped_file_keeps_external_map_reference_before_annotation() {
    let contents = "a { x: 1 }\n/*# sourceMappingURL=app.css.map */";
    let file = text_stage()
        .transform(mapped_fixture("/repo/src/app.css", contents))
        .await
        .unwrap();

    let text = file.text().unwrap();
    assert!(text.starts_with(contents));
    assert_eq!(text.matches("sourceMappingURL=data:").count(), 1);
    assert!(file.source_map.is_some());
}

#[tokio::test]
async fn test_second_pass_traces_back_to_the_first_source() {
    let stage = stage();
    let once = stage
        .transform(mapped_fixture("/repo/src/fixture.css", "a { color: black }"))
        .await
        .unwrap();
    let twice = stage.transform(once).await.unwrap();

    let text = twice.text().unwrap();
    assert_eq!(text.matches("sourceMappingURL").count(), 1);
    assert!(text.starts_with(
        "a { color: black; color: black; color: black; color: black }\n"
    ));

    let map = twice.source_map.as_ref().unwrap();
    assert_eq!(map.sources, vec!["fixture.css".to_string()]);
    assert_eq!(map.content_for("fixture.css"), Some("a { color: black }"));
    for mapping in decode(map).unwrap() {
        let original = mapping.original.unwrap();
        assert_eq!(original.line, 0);
        assert!(
            original.column == 0 || original.column == 4,
            "unexpected column {}",
            original.column
        );
    }
}

#[tokio::test]
async fn test_upstream_mappings_are_preserved() {
    // the file was compiled from fixture.scss by an earlier stage
    let mut upstream = SourceMapBuilder::new(Some("fixture.css"));
    upstream.add((0, 0), (2, 0), "fixture.scss", None);
    upstream.add((0, 4), (3, 2), "fixture.scss", Some("color"));
    upstream.set_source_content("fixture.scss", Some("$c: black;".to_string()));

    let file = FileObject::from_contents("a { color: black }")
        .with_base("/repo/src")
        .with_path("/repo/src/fixture.css")
        .with_source_map(upstream.build());
    let file = stage().transform(file).await.unwrap();

    let map = file.source_map.as_ref().unwrap();
    assert_eq!(map.file.as_deref(), Some("fixture.css"));
    assert_eq!(map.sources, vec!["fixture.scss".to_string()]);
    assert_eq!(map.content_for("fixture.scss"), Some("$c: black;"));

    let decoded = decode(map).unwrap();
    let rule = decoded[0].original.as_ref().unwrap();
    assert_eq!((rule.line, rule.column), (2, 0));
    for decl in &decoded[1..] {
        let original = decl.original.as_ref().unwrap();
        assert_eq!((original.line, original.column), (3, 2));
        assert_eq!(original.name.as_deref(), Some("color"));
    }
}
