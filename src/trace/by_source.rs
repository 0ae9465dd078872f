//! Reverse ("by-source") index construction
//!
//! Inverts a decoded generated→original map into original→generated
//! form: one entry per source, each a list of rows indexed by original
//! line, each row sorted by original column. Lines that no segment maps
//! to stay absent.

use std::cell::Cell;

use crate::search::SearchMemo;
use crate::segment::Segment;

/// One entry of the by-source index: an original column mapped back to
/// the generated position that referenced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReverseSegment {
    /// 0-based column in the original source.
    pub column: u32,
    /// 0-based line in the generated output.
    pub generated_line: u32,
    /// 0-based column in the generated output.
    pub generated_column: u32,
}

#[derive(Debug)]
pub(crate) struct BySourceIndex {
    /// Per source: rows indexed by original line; untouched lines are `None`.
    pub lines: Vec<Vec<Option<Vec<ReverseSegment>>>>,
    /// Per-source search memo, keyed by original line.
    pub memos: Vec<Cell<SearchMemo>>,
}

/// Build the reverse index in a single pass over the forward map.
///
/// Multiple forward segments may target the same original position; all
/// of them are preserved, in generated order within equal columns (the
/// per-row sort is stable).
pub(crate) fn build(decoded: &[Vec<Segment>], num_sources: usize) -> BySourceIndex {
    let mut lines: Vec<Vec<Option<Vec<ReverseSegment>>>> = vec![Vec::new(); num_sources];

    for (generated_line, row) in decoded.iter().enumerate() {
        for seg in row {
            let Some(origin) = seg.origin else { continue };
            let Some(source_lines) = lines.get_mut(origin.source as usize) else {
                continue;
            };
            let line = origin.line as usize;
            if source_lines.len() <= line {
                source_lines.resize(line + 1, None);
            }
            source_lines[line]
                .get_or_insert_with(Vec::new)
                .push(ReverseSegment {
                    column: origin.column,
                    generated_line: generated_line as u32,
                    generated_column: seg.column,
                });
        }
    }

    for source_lines in &mut lines {
        for row in source_lines.iter_mut().flatten() {
            row.sort_by_key(|reverse| reverse.column);
        }
    }

    BySourceIndex {
        lines,
        memos: (0..num_sources)
            .map(|_| Cell::new(SearchMemo::default()))
            .collect(),
    }
}
