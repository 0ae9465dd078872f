//! Integration tests for map chain composition

use sourcetrace::prelude::*;

fn parse(json: &str) -> SourceMapInput {
    serde_json::from_str(json).unwrap()
}

mod composition {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minified_then_transpiled_chain() {
        // helloworld.min.js -> helloworld.js -> helloworld.mjs
        let minified = parse(
            r#"{
                "version": 3,
                "file": "helloworld.min.js",
                "sources": ["helloworld.js"],
                "names": ["greet"],
                "mappings": "AAAA,KAAKA"
            }"#,
        );
        let transpiled = parse(
            r#"{
                "version": 3,
                "file": "helloworld.js",
                "sources": ["helloworld.mjs"],
                "sourcesContent": ["export const greet = 'hi';"],
                "names": [],
                "mappings": "AAAA,KAAK"
            }"#,
        );

        let mut loader = move |source: &str, _ctx: &mut LoaderContext| {
            (source == "helloworld.js").then(|| transpiled.clone())
        };
        let out = remap(minified, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();

        assert_eq!(out.file.as_deref(), Some("helloworld.min.js"));
        assert_eq!(out.sources, vec![Some("helloworld.mjs".to_string())]);
        assert_eq!(
            out.sources_content,
            Some(vec![Some("export const greet = 'hi';".to_string())])
        );
        assert_eq!(out.names, vec!["greet".to_string()]);
        assert_eq!(
            out.mappings,
            vec![vec![
                Segment::mapped(0, 0, 0, 0),
                Segment::named(5, 0, 0, 5, 0),
            ]]
        );
    }

    #[test]
    fn decoded_output_wraps_into_a_tracer() {
        let root = parse(
            r#"{"version":3,"sources":["original.js"],"names":[],"mappings":"AAAA,QAAQ"}"#,
        );
        let mut loader = |_: &str, _: &mut LoaderContext| None::<SourceMapInput>;
        let out = remap(
            root,
            &mut loader,
            RemapOptions {
                decoded_mappings: true,
                ..Default::default()
            },
        )
        .unwrap();

        let RemappedMap::Decoded(decoded) = out else {
            panic!("expected decoded output");
        };
        let map = TraceMap::presorted(decoded, None);
        let pos = map
            .original_position_for(GeneratedNeedle::new(1, 8))
            .unwrap()
            .unwrap();
        assert_eq!(pos.source, "original.js");
        assert_eq!(pos.column, 8);
    }

    #[test]
    fn source_root_applies_before_loading() {
        let root = parse(
            r#"{
                "version": 3,
                "sourceRoot": "https://cdn.example.com/lib/",
                "sources": ["mid.js"],
                "names": [],
                "mappings": "AAAA"
            }"#,
        );
        let mut seen = Vec::new();
        let mut loader = |source: &str, _ctx: &mut LoaderContext| {
            seen.push(source.to_string());
            None::<SourceMapInput>
        };
        let out = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();
        assert_eq!(seen, vec!["https://cdn.example.com/lib/mid.js".to_string()]);
        assert_eq!(
            out.sources,
            vec![Some("https://cdn.example.com/lib/mid.js".to_string())]
        );
    }

    #[test]
    fn three_level_chain_reaches_the_bottom() {
        let level = |source: &str| {
            format!(
                r#"{{"version":3,"sources":["{source}"],"names":[],"mappings":"AAAA,EAAE"}}"#
            )
        };
        let root = parse(&level("b.js"));
        let b = level("c.js");
        let c = level("original.ts");
        let mut loader = move |source: &str, _ctx: &mut LoaderContext| match source {
            "b.js" => Some(parse(&b)),
            "c.js" => Some(parse(&c)),
            _ => None,
        };

        let out = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();
        assert_eq!(out.sources, vec![Some("original.ts".to_string())]);
        assert_eq!(
            out.mappings,
            vec![vec![Segment::mapped(0, 0, 0, 0), Segment::mapped(2, 0, 0, 2)]]
        );
    }

    #[test]
    fn encoded_output_roundtrips_through_json() {
        let root = parse(
            r#"{"version":3,"file":"o.js","sources":["orig.js"],"names":[],"mappings":"AAAA"}"#,
        );
        let mut loader = |_: &str, _: &mut LoaderContext| None::<SourceMapInput>;
        let map = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_encoded();

        let json = map.to_json().unwrap();
        let reparsed = TraceMap::from_json(&json, None).unwrap();
        assert_eq!(reparsed.file.as_deref(), Some("o.js"));
        assert_eq!(reparsed.encoded_mappings(), "AAAA");
    }
}
