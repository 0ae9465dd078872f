//! Transitive composition of a source map chain
//!
//! Given a terminal map whose sources were themselves generated from
//! earlier maps, [`remap`] flattens the whole chain into a single map
//! from the terminal generated file to the ultimate originals. A
//! caller-supplied loader resolves each source name to the next map, or
//! to nothing for an original file.

use tracing::debug;

use crate::builder::SourceMapBuilder;
use crate::envelope::{DecodedSourceMap, SourceMap, SourceMapInput};
use crate::error::{Error, Result};
use crate::segment::{OriginalLocation, Segment};
use crate::trace::TraceMap;

/// The loader cannot recurse past this many map layers; a chain this
/// deep indicates a loader that keeps returning maps for its own
/// outputs.
const MAX_DEPTH: u32 = 128;

/// Options controlling [`remap`] output.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemapOptions {
    /// Suppress `sourcesContent` in the output.
    pub exclude_content: bool,
    /// Keep the output mappings decoded instead of re-encoding to VLQ.
    pub decoded_mappings: bool,
}

/// Context handed to the loader for each source it is asked about.
///
/// The loader may rewrite `source` to rename the file in the output and
/// may overwrite `content` (pre-filled from the importing map's
/// `sourcesContent`) to supply or suppress original content.
#[derive(Debug)]
pub struct LoaderContext {
    /// Resolved name of the map that imports this source.
    pub importer: String,
    /// 1-based nesting depth of the importing map.
    pub depth: u32,
    /// Resolved source name; mutable.
    pub source: String,
    /// Content for the source if it turns out to be an original leaf.
    pub content: Option<String>,
}

/// The composed output, in the form selected by
/// [`RemapOptions::decoded_mappings`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemappedMap {
    Encoded(SourceMap),
    Decoded(DecodedSourceMap),
}

impl RemappedMap {
    /// The output as an encoded envelope, encoding if necessary.
    pub fn into_encoded(self) -> SourceMap {
        match self {
            RemappedMap::Encoded(map) => map,
            RemappedMap::Decoded(map) => map.encode(),
        }
    }

    /// The output as a decoded envelope, decoding if necessary.
    pub fn into_decoded(self) -> Result<DecodedSourceMap> {
        match self {
            RemappedMap::Encoded(map) => map.decode(),
            RemappedMap::Decoded(map) => Ok(map),
        }
    }
}

enum SourceNode {
    Map(MapNode),
    Original(OriginalLeaf),
}

struct MapNode {
    map: TraceMap,
    children: Vec<SourceNode>,
}

struct OriginalLeaf {
    filename: String,
    content: Option<String>,
}

/// A position traced down to the bottom of the chain.
enum Traced<'a> {
    /// The trace ended on an unmapped segment; the output segment keeps
    /// only its generated column.
    Sourceless,
    Position {
        source: &'a str,
        line: u32,
        column: u32,
        name: Option<&'a str>,
        content: Option<&'a str>,
    },
}

/// Compose a map chain into a single flattened map.
///
/// `loader` is called once per source of every map in the chain, in
/// traversal order, with the resolved source name. Returning a map
/// recurses into it; returning `None` marks the source as an original
/// leaf.
pub fn remap<L>(input: impl Into<SourceMapInput>, loader: &mut L, options: RemapOptions) -> Result<RemappedMap>
where
    L: FnMut(&str, &mut LoaderContext) -> Option<SourceMapInput>,
{
    let root = TraceMap::new(input.into(), None)?;
    let tree = build_tree(root, "", 0, loader)?;
    let composed = trace_tree(&tree, &options)?;
    Ok(if options.decoded_mappings {
        RemappedMap::Decoded(composed)
    } else {
        RemappedMap::Encoded(composed.encode())
    })
}

fn build_tree<L>(map: TraceMap, importer: &str, importer_depth: u32, loader: &mut L) -> Result<MapNode>
where
    L: FnMut(&str, &mut LoaderContext) -> Option<SourceMapInput>,
{
    let depth = importer_depth + 1;
    if depth > MAX_DEPTH {
        return Err(Error::invalid_map(format!(
            "source map chain exceeds {MAX_DEPTH} levels"
        )));
    }

    let mut children = Vec::with_capacity(map.sources.len());
    for (i, resolved) in map.resolved_sources().iter().enumerate() {
        let mut ctx = LoaderContext {
            importer: importer.to_string(),
            depth,
            source: resolved.clone(),
            content: map
                .sources_content
                .as_ref()
                .and_then(|contents| contents.get(i))
                .cloned()
                .flatten(),
        };
        let requested = ctx.source.clone();
        let loaded = loader(&requested, &mut ctx);
        let LoaderContext { source, content, .. } = ctx;

        match loaded {
            Some(child_input) => {
                debug!(source = %source, depth, "descending into child map");
                let child = TraceMap::new(child_input, Some(&source))?;
                children.push(SourceNode::Map(build_tree(child, &source, depth, loader)?));
            }
            None => {
                debug!(source = %source, depth, "original leaf");
                children.push(SourceNode::Original(OriginalLeaf {
                    filename: source,
                    content,
                }));
            }
        }
    }

    Ok(MapNode { map, children })
}

fn trace_tree(root: &MapNode, options: &RemapOptions) -> Result<DecodedSourceMap> {
    let mut builder = SourceMapBuilder::new();
    if let Some(file) = &root.map.file {
        builder.set_file(file);
    }

    let decoded = root.map.decoded_mappings()?;
    for (line, row) in decoded.iter().enumerate() {
        for seg in row {
            let traced = match seg.origin {
                None => Some(Traced::Sourceless),
                Some(origin) => {
                    let child = root.children.get(origin.source as usize).ok_or_else(|| {
                        Error::invalid_map(format!(
                            "segment references source {} but the map has {}",
                            origin.source,
                            root.children.len()
                        ))
                    })?;
                    let name = match origin.name {
                        Some(n) => Some(lookup_name(&root.map, n)?),
                        None => None,
                    };
                    trace_position(child, origin.line, origin.column, name)?
                }
            };

            // A trace that found no child segment contributes nothing.
            let Some(traced) = traced else { continue };
            match traced {
                Traced::Sourceless => {
                    builder.add_segment(line as u32, Segment::unmapped(seg.column));
                }
                Traced::Position {
                    source,
                    line: src_line,
                    column: src_column,
                    name,
                    content,
                } => {
                    let source_index = builder.add_source(source);
                    if !options.exclude_content {
                        builder.set_source_content(source_index, content);
                    }
                    let name_index = name.map(|n| builder.add_name(n));
                    builder.add_segment(
                        line as u32,
                        Segment {
                            column: seg.column,
                            origin: Some(OriginalLocation {
                                source: source_index,
                                line: src_line,
                                column: src_column,
                                name: name_index,
                            }),
                        },
                    );
                }
            }
        }
    }

    Ok(builder.build())
}

/// Trace one original position down through a child node.
///
/// Names accumulate downward: the deepest map that records a name for
/// the position wins.
fn trace_position<'a>(
    node: &'a SourceNode,
    line: u32,
    column: u32,
    name: Option<&'a str>,
) -> Result<Option<Traced<'a>>> {
    match node {
        SourceNode::Original(leaf) => Ok(Some(Traced::Position {
            source: &leaf.filename,
            line,
            column,
            name: name.filter(|n| !n.is_empty()),
            content: leaf.content.as_deref(),
        })),
        SourceNode::Map(map_node) => {
            let decoded = map_node.map.decoded_mappings()?;
            if line as usize >= decoded.len() {
                return Err(Error::invalid_map(format!(
                    "mapping references line {line}, which does not exist in the child map"
                )));
            }
            let Some(seg) = map_node.map.trace_segment(line, column)? else {
                return Ok(None);
            };
            let Some(origin) = seg.origin else {
                return Ok(Some(Traced::Sourceless));
            };
            let child = map_node
                .children
                .get(origin.source as usize)
                .ok_or_else(|| {
                    Error::invalid_map(format!(
                        "segment references source {} but the map has {}",
                        origin.source,
                        map_node.children.len()
                    ))
                })?;
            let name = match origin.name {
                Some(n) => Some(lookup_name(&map_node.map, n)?),
                None => name,
            };
            trace_position(child, origin.line, origin.column, name)
        }
    }
}

fn lookup_name(map: &TraceMap, index: u32) -> Result<&str> {
    map.names
        .get(index as usize)
        .map(String::as_str)
        .ok_or_else(|| {
            Error::invalid_map(format!(
                "segment references name {} but the map has {}",
                index,
                map.names.len()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(
        sources: &[&str],
        names: &[&str],
        mappings: &str,
        contents: Option<Vec<Option<String>>>,
    ) -> SourceMapInput {
        SourceMapInput::Encoded(SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: sources.iter().map(|s| Some(s.to_string())).collect(),
            sources_content: contents,
            names: names.iter().map(|n| n.to_string()).collect(),
            mappings: mappings.to_string(),
        })
    }

    #[test]
    fn flattens_a_two_level_chain() {
        // root: out.js -> intermediate.js, child: intermediate.js -> original.js
        let root = encoded(&["intermediate.js"], &[], "AAAA,KAAK", None);
        let mut loader = |source: &str, _ctx: &mut LoaderContext| {
            (source == "intermediate.js")
                .then(|| encoded(&["original.js"], &[], "AAAA,KAAK", None))
        };

        let out = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();
        assert_eq!(out.sources, vec![Some("original.js".to_string())]);
        assert_eq!(
            out.mappings,
            vec![vec![Segment::mapped(0, 0, 0, 0), Segment::mapped(5, 0, 0, 5)]]
        );
    }

    #[test]
    fn child_names_override_root_names() {
        let root = encoded(&["mid.js"], &["rootName"], "AAAAA,KAAKA", None);
        let mut loader = |source: &str, _ctx: &mut LoaderContext| {
            (source == "mid.js").then(|| encoded(&["orig.js"], &["childName"], "AAAAA,KAAK", None))
        };

        let out = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();
        // Column 0 takes the child's name; column 5 has no child name
        // and keeps the root's.
        assert_eq!(
            out.names,
            vec!["childName".to_string(), "rootName".to_string()]
        );
        assert_eq!(out.mappings[0][0].origin.unwrap().name, Some(0));
        assert_eq!(out.mappings[0][1].origin.unwrap().name, Some(1));
    }

    #[test]
    fn untraceable_segments_are_dropped() {
        // The child has no mapping at column 5, and the root points past
        // the child's only segment's line at column 9.
        let root = encoded(&["mid.js"], &[], "AAAA,KAAK", None);
        let mut loader = |source: &str, _ctx: &mut LoaderContext| {
            // Child maps only columns >= 8 of line 0.
            (source == "mid.js").then(|| encoded(&["orig.js"], &[], "QAAA", None))
        };

        let out = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();
        // Both root segments trace to columns that precede the child's
        // first mapping: dropped.
        assert_eq!(out.mappings, Vec::<Vec<Segment>>::new());
        assert!(out.sources.is_empty());
    }

    #[test]
    fn unmapped_child_segments_become_sourceless() {
        let root = encoded(&["mid.js"], &[], "AAAA", None);
        let mut loader = |source: &str, _ctx: &mut LoaderContext| {
            // Child line 0 is covered by a 1-field segment.
            (source == "mid.js").then(|| encoded(&["orig.js"], &[], "A", None))
        };

        let out = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();
        assert_eq!(out.mappings, vec![vec![Segment::unmapped(0)]]);
        assert!(out.sources.is_empty());
    }

    #[test]
    fn root_sourceless_segments_survive() {
        let root = encoded(&["mid.js"], &[], "A,EAAA", None);
        let mut loader = |_: &str, _: &mut LoaderContext| None::<SourceMapInput>;
        let out = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();
        assert_eq!(out.mappings[0][0], Segment::unmapped(0));
        assert_eq!(out.mappings[0][1], Segment::mapped(2, 0, 0, 0));
    }

    #[test]
    fn invalid_child_line_is_an_error() {
        // Root points at line 7 of the child, which has a single line.
        let root = encoded(&["mid.js"], &[], "AAOA", None);
        let mut loader = |source: &str, _ctx: &mut LoaderContext| {
            (source == "mid.js").then(|| encoded(&["orig.js"], &[], "AAAA", None))
        };
        assert!(matches!(
            remap(root, &mut loader, RemapOptions::default()),
            Err(Error::InvalidMap(_))
        ));
    }

    #[test]
    fn loader_can_rewrite_source_and_content() {
        let root = encoded(&["mid.js"], &[], "AAAA", None);
        let mut loader = |source: &str, ctx: &mut LoaderContext| {
            if source == "mid.js" {
                Some(encoded(&["orig.js"], &[], "AAAA", None))
            } else {
                ctx.source = "renamed.js".to_string();
                ctx.content = Some("let renamed;".to_string());
                None
            }
        };

        let out = remap(root, &mut loader, RemapOptions::default())
            .unwrap()
            .into_decoded()
            .unwrap();
        assert_eq!(out.sources, vec![Some("renamed.js".to_string())]);
        assert_eq!(
            out.sources_content,
            Some(vec![Some("let renamed;".to_string())])
        );
    }

    #[test]
    fn exclude_content_suppresses_sources_content() {
        let root = encoded(
            &["orig.js"],
            &[],
            "AAAA",
            Some(vec![Some("let x;".to_string())]),
        );
        let mut loader = |_: &str, _: &mut LoaderContext| None::<SourceMapInput>;

        let kept = remap(
            root.clone(),
            &mut loader,
            RemapOptions::default(),
        )
        .unwrap()
        .into_decoded()
        .unwrap();
        assert_eq!(kept.sources_content, Some(vec![Some("let x;".to_string())]));

        let stripped = remap(
            root,
            &mut loader,
            RemapOptions {
                exclude_content: true,
                ..Default::default()
            },
        )
        .unwrap()
        .into_decoded()
        .unwrap();
        assert!(stripped.sources_content.is_none());
    }

    #[test]
    fn loader_sees_resolved_importer_and_depth() {
        let root = SourceMapInput::Encoded(SourceMap {
            version: 3,
            file: None,
            source_root: Some("webpack://app/".to_string()),
            sources: vec![Some("mid.js".to_string())],
            sources_content: None,
            names: vec![],
            mappings: "AAAA".to_string(),
        });
        let mut calls = Vec::new();
        let mut loader = |source: &str, ctx: &mut LoaderContext| {
            calls.push((source.to_string(), ctx.importer.clone(), ctx.depth));
            (source == "webpack://app/mid.js")
                .then(|| encoded(&["orig.js"], &[], "AAAA", None))
        };

        remap(root, &mut loader, RemapOptions::default()).unwrap();
        assert_eq!(
            calls,
            vec![
                ("webpack://app/mid.js".to_string(), String::new(), 1),
                (
                    "webpack://app/orig.js".to_string(),
                    "webpack://app/mid.js".to_string(),
                    2,
                ),
            ]
        );
    }

    #[test]
    fn encoded_output_by_default() {
        let root = encoded(&["orig.js"], &[], "AAAA", None);
        let mut loader = |_: &str, _: &mut LoaderContext| None::<SourceMapInput>;
        let out = remap(root, &mut loader, RemapOptions::default()).unwrap();
        match out {
            RemappedMap::Encoded(map) => assert_eq!(map.mappings, "AAAA"),
            RemappedMap::Decoded(_) => panic!("expected encoded output"),
        }
    }
}
