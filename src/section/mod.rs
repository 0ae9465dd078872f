//! Sectioned ("index") map flattening
//!
//! A sectioned map carries no mappings of its own; each section places a
//! child map (standard or itself sectioned) at a generated offset. The
//! flattener walks the sections in order, shifting each child's rows by
//! the accumulated offset and truncating segments that would spill into
//! the next section's territory, while deduplicating sources and names
//! into shared tables.

use crate::builder::UniqueTable;
use crate::envelope::{DecodedSourceMap, SectionedSourceMap, SourceMapInput};
use crate::error::{Error, Result};
use crate::segment::{OriginalLocation, Segment};
use crate::trace::TraceMap;

struct FlattenState {
    mappings: Vec<Vec<Segment>>,
    sources: UniqueTable,
    sources_content: Vec<Option<String>>,
    names: UniqueTable,
}

/// Flatten a sectioned map into a single tracer.
///
/// Section order produces sorted rows, so the result skips the sort
/// check.
pub(crate) fn flatten(map: SectionedSourceMap, map_url: Option<&str>) -> Result<TraceMap> {
    if map.version != 3 {
        return Err(Error::UnsupportedVersion(map.version));
    }

    let mut state = FlattenState {
        mappings: Vec::new(),
        sources: UniqueTable::default(),
        sources_content: Vec::new(),
        names: UniqueTable::default(),
    };

    let file = map.file.clone();
    recurse(
        SourceMapInput::Sectioned(map),
        map_url,
        &mut state,
        0,
        0,
        u32::MAX,
        u32::MAX,
    )?;

    let decoded = DecodedSourceMap {
        version: 3,
        file,
        source_root: None,
        sources: state.sources.into_items().into_iter().map(Some).collect(),
        sources_content: Some(state.sources_content),
        names: state.names.into_items(),
        mappings: state.mappings,
    };
    Ok(TraceMap::presorted(decoded, None))
}

fn recurse(
    input: SourceMapInput,
    map_url: Option<&str>,
    state: &mut FlattenState,
    line_offset: u32,
    column_offset: u32,
    stop_line: u32,
    stop_column: u32,
) -> Result<()> {
    match input {
        SourceMapInput::Sectioned(map) => {
            if map.version != 3 {
                return Err(Error::UnsupportedVersion(map.version));
            }
            let offsets: Vec<_> = map.sections.iter().map(|s| s.offset).collect();
            for (i, section) in map.sections.into_iter().enumerate() {
                // A child may not spill past the start of its successor.
                let mut child_stop_line = stop_line;
                let mut child_stop_column = stop_column;
                if let Some(next) = offsets.get(i + 1) {
                    let candidate = line_offset.saturating_add(next.line);
                    if candidate < child_stop_line {
                        child_stop_line = candidate;
                        child_stop_column = column_offset.saturating_add(next.column);
                    } else if candidate == child_stop_line {
                        child_stop_column =
                            child_stop_column.min(column_offset.saturating_add(next.column));
                    }
                }
                recurse(
                    *section.map,
                    map_url,
                    state,
                    line_offset.saturating_add(section.offset.line),
                    column_offset.saturating_add(section.offset.column),
                    child_stop_line,
                    child_stop_column,
                )?;
            }
            Ok(())
        }
        leaf => add_section(
            TraceMap::new(leaf, map_url)?,
            state,
            line_offset,
            column_offset,
            stop_line,
            stop_column,
        ),
    }
}

fn add_section(
    parsed: TraceMap,
    state: &mut FlattenState,
    line_offset: u32,
    column_offset: u32,
    stop_line: u32,
    stop_column: u32,
) -> Result<()> {
    // Remap this section's source and name indices into the shared
    // tables; a source keeps the content recorded at first insertion.
    let mut source_indexes = Vec::with_capacity(parsed.resolved_sources().len());
    for (i, resolved) in parsed.resolved_sources().iter().enumerate() {
        let index = state.sources.intern(resolved);
        if index as usize == state.sources_content.len() {
            state.sources_content.push(
                parsed
                    .sources_content
                    .as_ref()
                    .and_then(|contents| contents.get(i))
                    .cloned()
                    .flatten(),
            );
        }
        source_indexes.push(index);
    }
    let name_indexes: Vec<u32> = parsed
        .names
        .iter()
        .map(|name| state.names.intern(name))
        .collect();

    let decoded = parsed.decoded_mappings()?;
    for (r, row) in decoded.iter().enumerate() {
        let line = line_offset.saturating_add(r as u32);
        if line > stop_line {
            return Ok(());
        }
        // Only the first row of a section is column-shifted; subsequent
        // rows start at column 0 of their own generated line.
        let shift = if r == 0 { column_offset } else { 0 };
        let out = line_at(&mut state.mappings, line);

        for seg in row {
            let column = shift.saturating_add(seg.column);
            if line == stop_line && column >= stop_column {
                return Ok(());
            }
            match seg.origin {
                None => out.push(Segment::unmapped(column)),
                Some(origin) => {
                    let Some(&source) = source_indexes.get(origin.source as usize) else {
                        continue;
                    };
                    out.push(Segment {
                        column,
                        origin: Some(OriginalLocation {
                            source,
                            line: origin.line,
                            column: origin.column,
                            name: origin
                                .name
                                .and_then(|n| name_indexes.get(n as usize).copied()),
                        }),
                    });
                }
            }
        }
    }
    Ok(())
}

fn line_at(mappings: &mut Vec<Vec<Segment>>, line: u32) -> &mut Vec<Segment> {
    let line = line as usize;
    while mappings.len() <= line {
        mappings.push(Vec::new());
    }
    &mut mappings[line]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Section, SectionOffset, SourceMap};
    use crate::trace::GeneratedNeedle;

    fn leaf(source: &str, name: &str) -> SourceMapInput {
        SourceMapInput::Encoded(SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: vec![Some(source.to_string())],
            sources_content: None,
            names: vec![name.to_string()],
            // [0, 0, 0, 0, 0]
            mappings: "AAAAA".to_string(),
        })
    }

    fn section(line: u32, column: u32, map: SourceMapInput) -> Section {
        Section {
            offset: SectionOffset { line, column },
            map: Box::new(map),
        }
    }

    #[test]
    fn nested_sections_shift_and_deduplicate() {
        let inner = SectionedSourceMap {
            version: 3,
            file: None,
            sections: vec![
                section(0, 1, leaf("a.js", "first")),
                section(0, 2, leaf("b.js", "second")),
            ],
        };
        let outer = SectionedSourceMap {
            version: 3,
            file: Some("joined.js".to_string()),
            sections: vec![section(1, 1, SourceMapInput::Sectioned(inner))],
        };

        let map = TraceMap::new(outer, None).unwrap();
        let rows = map.decoded_mappings().unwrap();
        assert_eq!(rows[0], vec![]);
        assert_eq!(
            rows[1],
            vec![Segment::named(2, 0, 0, 0, 0), Segment::named(3, 1, 0, 0, 1)]
        );
        assert_eq!(
            map.sources,
            vec![Some("a.js".to_string()), Some("b.js".to_string())]
        );
        assert_eq!(map.names, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn repeated_sources_collapse_to_one_entry() {
        let sectioned = SectionedSourceMap {
            version: 3,
            file: None,
            sections: vec![
                section(0, 0, leaf("shared.js", "one")),
                section(1, 0, leaf("shared.js", "two")),
            ],
        };
        let map = TraceMap::new(sectioned, None).unwrap();
        assert_eq!(map.sources, vec![Some("shared.js".to_string())]);
        let rows = map.decoded_mappings().unwrap();
        assert_eq!(rows[0][0].origin.unwrap().source, 0);
        assert_eq!(rows[1][0].origin.unwrap().source, 0);
    }

    #[test]
    fn next_section_truncates_spill() {
        // First leaf has segments at columns 0 and 10 of its row 0; the
        // second section starts at column 5 of the same line, so the
        // second segment is discarded.
        let wide = SourceMapInput::Encoded(SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: vec![Some("wide.js".to_string())],
            sources_content: None,
            names: vec![],
            // [0,0,0,0] and [10,0,0,10]
            mappings: "AAAA,UAAU".to_string(),
        });
        let sectioned = SectionedSourceMap {
            version: 3,
            file: None,
            sections: vec![
                section(0, 0, wide),
                section(0, 5, leaf("next.js", "n")),
            ],
        };
        let map = TraceMap::new(sectioned, None).unwrap();
        let rows = map.decoded_mappings().unwrap();
        let columns: Vec<u32> = rows[0].iter().map(|s| s.column).collect();
        assert_eq!(columns, vec![0, 5]);
        let query = map
            .original_position_for(GeneratedNeedle::new(1, 5))
            .unwrap()
            .unwrap();
        assert_eq!(query.source, "next.js");
    }

    #[test]
    fn multi_line_leaf_only_shifts_first_row() {
        let two_lines = SourceMapInput::Encoded(SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: vec![Some("m.js".to_string())],
            sources_content: None,
            names: vec![],
            // line 0: [3,0,0,0]; line 1: [4,0,1,0]
            mappings: "GAAA;IACA".to_string(),
        });
        let sectioned = SectionedSourceMap {
            version: 3,
            file: None,
            sections: vec![section(2, 10, two_lines)],
        };
        let map = TraceMap::new(sectioned, None).unwrap();
        let rows = map.decoded_mappings().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2][0].column, 13);
        assert_eq!(rows[3][0].column, 4);
    }

    #[test]
    fn section_content_travels() {
        let with_content = SourceMapInput::Encoded(SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: vec![Some("c.js".to_string())],
            sources_content: Some(vec![Some("const c = 3;".to_string())]),
            names: vec![],
            mappings: "AAAA".to_string(),
        });
        let sectioned = SectionedSourceMap {
            version: 3,
            file: None,
            sections: vec![section(0, 0, with_content)],
        };
        let map = TraceMap::new(sectioned, None).unwrap();
        assert_eq!(map.source_content_for("c.js"), Some("const c = 3;"));
    }
}
