//! Shared test helpers for integration tests

use sourcetrace::envelope::DecodedSourceMap;
use sourcetrace::segment::Segment;
use sourcetrace::TraceMap;

/// A two-line map over `input.js` with named and unnamed segments,
/// including duplicate original targets on line 1.
pub fn fixture_decoded() -> DecodedSourceMap {
    DecodedSourceMap {
        version: 3,
        file: Some("bundle.js".to_string()),
        source_root: None,
        sources: vec![Some("input.js".to_string())],
        sources_content: Some(vec![Some("throw new Error('fail');".to_string())]),
        names: vec!["foo".to_string(), "bar".to_string(), "Error".to_string()],
        mappings: vec![
            vec![
                Segment::mapped(0, 0, 0, 0),
                Segment::named(9, 0, 0, 9, 0),
                Segment::mapped(12, 0, 0, 0),
                Segment::named(13, 0, 0, 13, 1),
                Segment::mapped(16, 0, 0, 0),
                Segment::mapped(18, 0, 0, 33),
            ],
            vec![
                Segment::mapped(0, 0, 1, 0),
                Segment::named(9, 0, 1, 9, 0),
                Segment::named(12, 0, 1, 14, 2),
                Segment::mapped(16, 0, 1, 10),
                Segment::mapped(18, 0, 1, 33),
            ],
        ],
    }
}

/// The fixture wrapped in a tracer, resolved against a map URL.
pub fn fixture_map() -> TraceMap {
    TraceMap::new(fixture_decoded(), Some("https://example.com/bundle.js.map")).unwrap()
}
