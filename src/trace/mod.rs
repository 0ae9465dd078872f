//! TraceMap: bidirectional queries over a decoded source map
//!
//! A [`TraceMap`] holds the envelope metadata together with exactly one
//! of the encoded `mappings` string or the decoded rows; the other form
//! is computed on first use and cached for the lifetime of the
//! instance, as are the by-source reverse index and the search memos.
//!
//! Query conventions follow the established source map tooling:
//! [`TraceMap::trace_segment`] is 0-based in both axes, while
//! [`TraceMap::original_position_for`] and
//! [`TraceMap::generated_position_for`] take 1-based lines and 0-based
//! columns and return the same.
//!
//! Instances confine their lazy caches to interior mutability and are
//! intended for single-threaded use.

mod by_source;

pub use by_source::ReverseSegment;

use std::cell::{Cell, OnceCell};

use crate::envelope::{DecodedSourceMap, SourceMap, SourceMapInput};
use crate::error::{Error, Result};
use crate::resolve::{resolve, strip_filename};
use crate::search::{lower_bound, memoized_binary_search, upper_bound, Bias, SearchKey, SearchMemo};
use crate::segment::{self, Segment};
use crate::vlq;
use by_source::BySourceIndex;

/// A 1-based generated position to look up an original position for.
#[derive(Debug, Clone, Copy)]
pub struct GeneratedNeedle {
    /// 1-based line in the generated output.
    pub line: u32,
    /// 0-based column in the generated output.
    pub column: u32,
    pub bias: Bias,
}

impl GeneratedNeedle {
    pub fn new(line: u32, column: u32) -> Self {
        GeneratedNeedle {
            line,
            column,
            bias: Bias::default(),
        }
    }

    pub fn with_bias(mut self, bias: Bias) -> Self {
        self.bias = bias;
        self
    }
}

/// A 1-based original position to look up generated positions for.
#[derive(Debug, Clone, Copy)]
pub struct OriginalNeedle<'a> {
    /// Source name, matched against `sources` and then resolved sources.
    pub source: &'a str,
    /// 1-based line in the original source.
    pub line: u32,
    /// 0-based column in the original source.
    pub column: u32,
    pub bias: Bias,
}

impl<'a> OriginalNeedle<'a> {
    pub fn new(source: &'a str, line: u32, column: u32) -> Self {
        OriginalNeedle {
            source,
            line,
            column,
            bias: Bias::default(),
        }
    }

    pub fn with_bias(mut self, bias: Bias) -> Self {
        self.bias = bias;
        self
    }
}

/// Result of a generated→original query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    /// Resolved source URL.
    pub source: String,
    /// 1-based line in the original source.
    pub line: u32,
    /// 0-based column in the original source.
    pub column: u32,
    /// Symbol name, when the matched segment carries one.
    pub name: Option<String>,
}

/// Result of an original→generated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedPosition {
    /// 1-based line in the generated output.
    pub line: u32,
    /// 0-based column in the generated output.
    pub column: u32,
}

/// One mapping as seen by [`TraceMap::each_mapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingItem<'a> {
    /// 1-based line in the generated output.
    pub generated_line: u32,
    /// 0-based column in the generated output.
    pub generated_column: u32,
    /// Resolved source URL, for mapped segments.
    pub source: Option<&'a str>,
    /// 1-based line in the original source, for mapped segments.
    pub original_line: Option<u32>,
    /// 0-based column in the original source, for mapped segments.
    pub original_column: Option<u32>,
    pub name: Option<&'a str>,
}

/// Public tracer over a single source map.
#[derive(Debug)]
pub struct TraceMap {
    /// Name of the generated file, if recorded.
    pub file: Option<String>,
    /// Source root prefix from the envelope.
    pub source_root: Option<String>,
    /// Raw source names (entries may be null).
    pub sources: Vec<Option<String>>,
    /// Source contents parallel to `sources`, if recorded.
    pub sources_content: Option<Vec<Option<String>>>,
    /// Symbol names referenced by mappings.
    pub names: Vec<String>,

    resolved_sources: Vec<String>,
    encoded: OnceCell<String>,
    decoded: OnceCell<Vec<Vec<Segment>>>,
    by_source: OnceCell<BySourceIndex>,
    decoded_memo: Cell<SearchMemo>,
}

impl TraceMap {
    /// Create a tracer from a JSON envelope string.
    ///
    /// Decoded mapping arrays inside a JSON string are trusted to be
    /// sorted; use [`TraceMap::new`] for programmatic inputs that need
    /// the sort check.
    pub fn from_json(json: &str, map_url: Option<&str>) -> Result<Self> {
        let input: SourceMapInput = serde_json::from_str(json)?;
        Self::build(input, map_url, true)
    }

    /// Create a tracer from any accepted input shape.
    ///
    /// Sectioned maps are flattened; decoded mapping rows are checked
    /// and stable-sorted when out of order.
    pub fn new(input: impl Into<SourceMapInput>, map_url: Option<&str>) -> Result<Self> {
        Self::build(input.into(), map_url, false)
    }

    /// Create a tracer from a decoded map known to be sorted, skipping
    /// the sort check.
    pub fn presorted(map: DecodedSourceMap, map_url: Option<&str>) -> Self {
        Self::from_decoded_parts(map, map_url, false)
    }

    fn build(input: SourceMapInput, map_url: Option<&str>, trusted_sort: bool) -> Result<Self> {
        match input {
            SourceMapInput::Sectioned(map) => crate::section::flatten(map, map_url),
            SourceMapInput::Encoded(map) => {
                if map.version != 3 {
                    return Err(Error::UnsupportedVersion(map.version));
                }
                let resolved_sources = resolve_sources(&map.sources, map.source_root.as_deref(), map_url);
                let encoded = OnceCell::new();
                let _ = encoded.set(map.mappings);
                Ok(TraceMap {
                    file: map.file,
                    source_root: map.source_root,
                    sources: map.sources,
                    sources_content: map.sources_content,
                    names: map.names,
                    resolved_sources,
                    encoded,
                    decoded: OnceCell::new(),
                    by_source: OnceCell::new(),
                    decoded_memo: Cell::new(SearchMemo::default()),
                })
            }
            SourceMapInput::Decoded(map) => {
                if map.version != 3 {
                    return Err(Error::UnsupportedVersion(map.version));
                }
                Ok(Self::from_decoded_parts(map, map_url, !trusted_sort))
            }
        }
    }

    fn from_decoded_parts(map: DecodedSourceMap, map_url: Option<&str>, check_sort: bool) -> Self {
        let mut mappings = map.mappings;
        if check_sort {
            segment::maybe_sort(&mut mappings);
        }
        let resolved_sources = resolve_sources(&map.sources, map.source_root.as_deref(), map_url);
        let decoded = OnceCell::new();
        let _ = decoded.set(mappings);
        TraceMap {
            file: map.file,
            source_root: map.source_root,
            sources: map.sources,
            sources_content: map.sources_content,
            names: map.names,
            resolved_sources,
            encoded: OnceCell::new(),
            decoded,
            by_source: OnceCell::new(),
            decoded_memo: Cell::new(SearchMemo::default()),
        }
    }

    /// Source names resolved against `sourceRoot` and the map URL.
    pub fn resolved_sources(&self) -> &[String] {
        &self.resolved_sources
    }

    /// The VLQ-encoded mappings, encoding them first if only the
    /// decoded form is held.
    pub fn encoded_mappings(&self) -> &str {
        if let Some(encoded) = self.encoded.get() {
            return encoded;
        }
        let rows = self.decoded.get().map(Vec::as_slice).unwrap_or_default();
        let encoded = vlq::encode_mappings(rows);
        self.encoded.get_or_init(|| encoded)
    }

    /// The decoded mapping rows, decoding them first if only the
    /// encoded form is held.
    pub fn decoded_mappings(&self) -> Result<&[Vec<Segment>]> {
        if let Some(rows) = self.decoded.get() {
            return Ok(rows);
        }
        let encoded = self.encoded.get().map(String::as_str).unwrap_or_default();
        let rows = vlq::decode_mappings(encoded)?;
        Ok(self.decoded.get_or_init(|| rows))
    }

    /// The segment covering a 0-based generated position, or `None`.
    pub fn trace_segment(&self, line: u32, column: u32) -> Result<Option<Segment>> {
        let decoded = self.decoded_mappings()?;
        let Some(row) = decoded.get(line as usize) else {
            return Ok(None);
        };
        let (index, _) = trace_segment_internal(
            row,
            &self.decoded_memo,
            line,
            column,
            Bias::GreatestLowerBound,
        );
        Ok((index != -1).then(|| row[index as usize]))
    }

    /// The original position for a generated one, or `None` when the
    /// position maps to nothing.
    pub fn original_position_for(&self, needle: GeneratedNeedle) -> Result<Option<OriginalPosition>> {
        if needle.line < 1 {
            return Err(Error::InvalidCoordinate(
                "line must be greater than 0 (lines start at line 1)".to_string(),
            ));
        }
        let line = needle.line - 1;

        let decoded = self.decoded_mappings()?;
        let Some(row) = decoded.get(line as usize) else {
            return Ok(None);
        };
        let (index, _) =
            trace_segment_internal(row, &self.decoded_memo, line, needle.column, needle.bias);
        if index == -1 {
            return Ok(None);
        }

        let Some(origin) = row[index as usize].origin else {
            return Ok(None);
        };
        let Some(source) = self.resolved_sources.get(origin.source as usize) else {
            return Ok(None);
        };
        Ok(Some(OriginalPosition {
            source: source.clone(),
            line: origin.line + 1,
            column: origin.column,
            name: origin
                .name
                .and_then(|n| self.names.get(n as usize).cloned()),
        }))
    }

    /// The generated position for an original one, or `None`.
    pub fn generated_position_for(&self, needle: OriginalNeedle<'_>) -> Result<Option<GeneratedPosition>> {
        let Some((row, memo, line)) = self.reverse_row(&needle)? else {
            return Ok(None);
        };
        let (index, _) = trace_segment_internal(row, memo, line, needle.column, needle.bias);
        if index == -1 {
            return Ok(None);
        }
        Ok(Some(to_generated(&row[index as usize])))
    }

    /// Every generated position mapping back to the matched original
    /// column band, in reverse-index order.
    pub fn all_generated_positions_for(&self, needle: OriginalNeedle<'_>) -> Result<Vec<GeneratedPosition>> {
        let Some((row, memo, line)) = self.reverse_row(&needle)? else {
            return Ok(Vec::new());
        };

        // Trace with the greatest lower bound regardless of the caller's
        // bias so the first match in insertion order is found; a missed
        // search under LEAST_UPPER_BOUND starts one past it.
        let (mut min, found) =
            trace_segment_internal(row, memo, line, needle.column, Bias::GreatestLowerBound);
        if !found && needle.bias == Bias::LeastUpperBound {
            min += 1;
        }
        if min == -1 || min as usize == row.len() {
            return Ok(Vec::new());
        }

        // A miss lands on a segment with a different column; widen over
        // that column instead, since all its segments span the needle.
        let matched = if found {
            needle.column
        } else {
            row[min as usize].column
        };
        if !found {
            min = lower_bound(row, matched, min);
        }
        let max = upper_bound(row, matched, min);

        Ok((min..=max)
            .map(|i| to_generated(&row[i as usize]))
            .collect())
    }

    /// Invoke `callback` once per segment, in generated order.
    pub fn each_mapping<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(MappingItem<'_>),
    {
        let decoded = self.decoded_mappings()?;
        for (line, row) in decoded.iter().enumerate() {
            for seg in row {
                let mut item = MappingItem {
                    generated_line: line as u32 + 1,
                    generated_column: seg.column,
                    source: None,
                    original_line: None,
                    original_column: None,
                    name: None,
                };
                if let Some(origin) = seg.origin {
                    item.source = self
                        .resolved_sources
                        .get(origin.source as usize)
                        .map(String::as_str);
                    item.original_line = Some(origin.line + 1);
                    item.original_column = Some(origin.column);
                    item.name = origin
                        .name
                        .and_then(|n| self.names.get(n as usize))
                        .map(String::as_str);
                }
                callback(item);
            }
        }
        Ok(())
    }

    /// The recorded content for a source, matched against the raw
    /// `sources` entries first and the resolved ones second.
    pub fn source_content_for(&self, source: &str) -> Option<&str> {
        let contents = self.sources_content.as_ref()?;
        let index = self.source_index(source)?;
        contents.get(index)?.as_deref()
    }

    /// A fresh decoded envelope for this map.
    pub fn decoded_map(&self) -> Result<DecodedSourceMap> {
        Ok(DecodedSourceMap {
            version: 3,
            file: self.file.clone(),
            source_root: self.source_root.clone(),
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: self.names.clone(),
            mappings: self.decoded_mappings()?.to_vec(),
        })
    }

    /// A fresh encoded envelope for this map.
    pub fn encoded_map(&self) -> SourceMap {
        SourceMap {
            version: 3,
            file: self.file.clone(),
            source_root: self.source_root.clone(),
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: self.names.clone(),
            mappings: self.encoded_mappings().to_string(),
        }
    }

    fn source_index(&self, source: &str) -> Option<usize> {
        self.sources
            .iter()
            .position(|s| s.as_deref() == Some(source))
            .or_else(|| self.resolved_sources.iter().position(|s| s == source))
    }

    fn reverse_row(
        &self,
        needle: &OriginalNeedle<'_>,
    ) -> Result<Option<(&[ReverseSegment], &Cell<SearchMemo>, u32)>> {
        if needle.line < 1 {
            return Err(Error::InvalidCoordinate(
                "line must be greater than 0 (lines start at line 1)".to_string(),
            ));
        }
        let line = needle.line - 1;

        let Some(source_index) = self.source_index(needle.source) else {
            return Ok(None);
        };
        let by_source = self.by_source()?;
        let Some(row) = by_source.lines[source_index]
            .get(line as usize)
            .and_then(Option::as_deref)
        else {
            return Ok(None);
        };
        Ok(Some((row, &by_source.memos[source_index], line)))
    }

    fn by_source(&self) -> Result<&BySourceIndex> {
        if let Some(index) = self.by_source.get() {
            return Ok(index);
        }
        let decoded = self.decoded_mappings()?;
        let index = by_source::build(decoded, self.sources.len());
        Ok(self.by_source.get_or_init(|| index))
    }
}

fn resolve_sources(
    sources: &[Option<String>],
    source_root: Option<&str>,
    map_url: Option<&str>,
) -> Vec<String> {
    let base = resolve(
        source_root.unwrap_or_default(),
        strip_filename(map_url.unwrap_or_default()),
    );
    sources
        .iter()
        .map(|source| resolve(source.as_deref().unwrap_or_default(), &base))
        .collect()
}

/// Search one row with the shared memoized search, then apply the bias.
///
/// Returns `(index, found)`; the index is `-1` when the biased result
/// falls outside the row.
fn trace_segment_internal<T: SearchKey>(
    segments: &[T],
    memo: &Cell<SearchMemo>,
    key: u32,
    needle: u32,
    bias: Bias,
) -> (i64, bool) {
    let mut state = memo.get();
    let (mut index, found) = memoized_binary_search(segments, needle, &mut state, key);
    memo.set(state);

    if found {
        index = match bias {
            Bias::LeastUpperBound => upper_bound(segments, needle, index),
            Bias::GreatestLowerBound => lower_bound(segments, needle, index),
        };
    } else if bias == Bias::LeastUpperBound {
        index += 1;
    }

    if index == -1 || index as usize == segments.len() {
        (-1, found)
    } else {
        (index, found)
    }
}

fn to_generated(reverse: &ReverseSegment) -> GeneratedPosition {
    GeneratedPosition {
        line: reverse.generated_line + 1,
        column: reverse.generated_column,
    }
}
